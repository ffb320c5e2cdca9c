//! Faces for rendered PDF text.
//!
//! Documents whose text fits WinAnsi are set in the standard Helvetica face,
//! which every reader carries, so nothing is embedded. Any other character
//! switches the whole document to the bundled DejaVu Sans, embedded as a
//! CID-keyed TrueType font (`Identity-H`). CIDs are handed out per document in
//! order of first use, and a `ToUnicode` map sends each one back to its
//! character, so the text extracts unchanged even where the face has no glyph
//! and draws its missing-glyph box.

use crate::error::ConversionError;
use crate::format::Format;
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::HashMap;
use std::fmt::Write as _;
use ttf_parser::{Face, GlyphId};

static DEJAVU_SANS: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const DEJAVU_SANS_NAME: &str = "DejaVuSans";

/// Entries per `beginbfchar` block; PostScript caps a block at 100.
const BFCHAR_BLOCK: usize = 100;

/// The face a document is set in.
pub(crate) enum FontFace {
    Helvetica,
    Unicode(UnicodeFont),
}

impl FontFace {
    /// Pick the face for a document. `text` yields every string that will be
    /// drawn.
    pub(crate) fn for_text<'t>(
        text: impl IntoIterator<Item = &'t str> + Clone,
    ) -> Result<Self, ConversionError> {
        let fits_win_ansi = text
            .clone()
            .into_iter()
            .flat_map(str::chars)
            .all(|c| c == '\n' || win_ansi_byte(c).is_some());
        if fits_win_ansi {
            return Ok(FontFace::Helvetica);
        }
        UnicodeFont::new(text).map(FontFace::Unicode)
    }

    /// Advance width of `c` in 1/1000 em.
    pub(crate) fn char_width(&self, c: char) -> i64 {
        match self {
            FontFace::Helvetica => win_ansi_byte(c).map_or(556, glyph_width),
            FontFace::Unicode(font) => font.char_width(c),
        }
    }

    pub(crate) fn text_width(&self, text: &str) -> i64 {
        text.chars().map(|c| self.char_width(c)).sum()
    }

    /// Encode one line for a `Tj` operand.
    pub(crate) fn encode(&self, line: &str) -> Object {
        match self {
            FontFace::Helvetica => Object::String(
                line.chars().filter_map(win_ansi_byte).collect(),
                StringFormat::Literal,
            ),
            FontFace::Unicode(font) => Object::String(font.encode(line), StringFormat::Hexadecimal),
        }
    }

    /// Characters drawn as the missing-glyph box.
    pub(crate) fn missing_glyphs(&self) -> usize {
        match self {
            FontFace::Helvetica => 0,
            FontFace::Unicode(font) => font.missing,
        }
    }

    /// Add the font objects to `doc` and return the font dictionary's id.
    pub(crate) fn add_to(&self, doc: &mut Document) -> ObjectId {
        match self {
            FontFace::Helvetica => doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }),
            FontFace::Unicode(font) => font.add_to(doc),
        }
    }
}

// ── Embedded Unicode face ────────────────────────────────────────────────────

pub(crate) struct UnicodeFont {
    face: Face<'static>,
    /// Characters in CID order: CID `n` draws `chars[n - 1]`.
    chars: Vec<char>,
    cids: HashMap<char, u16>,
    missing: usize,
}

impl UnicodeFont {
    fn new<'t>(text: impl IntoIterator<Item = &'t str>) -> Result<Self, ConversionError> {
        let face = Face::parse(DEJAVU_SANS, 0).map_err(|e| ConversionError::encoding(Format::Pdf, e))?;

        let mut chars = Vec::new();
        let mut cids = HashMap::new();
        let mut missing = 0;
        for c in text.into_iter().flat_map(str::chars).filter(|&c| c != '\n') {
            if face.glyph_index(c).is_none() {
                missing += 1;
            }
            if cids.contains_key(&c) {
                continue;
            }
            let cid = u16::try_from(chars.len() + 1)
                .ok()
                .filter(|&cid| cid < u16::MAX)
                .ok_or_else(|| {
                    ConversionError::encoding(Format::Pdf, "more distinct characters than a CID font can address")
                })?;
            cids.insert(c, cid);
            chars.push(c);
        }

        Ok(Self {
            face,
            chars,
            cids,
            missing,
        })
    }

    fn glyph(&self, c: char) -> GlyphId {
        self.face.glyph_index(c).unwrap_or(GlyphId(0))
    }

    fn scale(&self, units: i64) -> i64 {
        units * 1000 / i64::from(self.face.units_per_em().max(1))
    }

    fn char_width(&self, c: char) -> i64 {
        let advance = self.face.glyph_hor_advance(self.glyph(c)).unwrap_or(0);
        self.scale(i64::from(advance))
    }

    fn encode(&self, line: &str) -> Vec<u8> {
        line.chars()
            .filter_map(|c| self.cids.get(&c))
            .flat_map(|cid| cid.to_be_bytes())
            .collect()
    }

    fn add_to(&self, doc: &mut Document) -> ObjectId {
        let bbox = self.face.global_bounding_box();
        let ascent = self.scale(i64::from(self.face.ascender()));
        let descent = self.scale(i64::from(self.face.descender()));
        let cap_height = self.scale(i64::from(
            self.face.capital_height().unwrap_or(self.face.ascender()),
        ));

        let font_file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => DEJAVU_SANS.len() as i64 },
            DEJAVU_SANS.to_vec(),
        ));
        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => DEJAVU_SANS_NAME,
            "Flags" => 32,
            "FontBBox" => vec![
                self.scale(i64::from(bbox.x_min)).into(),
                self.scale(i64::from(bbox.y_min)).into(),
                self.scale(i64::from(bbox.x_max)).into(),
                self.scale(i64::from(bbox.y_max)).into(),
            ],
            "ItalicAngle" => 0,
            "Ascent" => ascent,
            "Descent" => descent,
            "CapHeight" => cap_height,
            "StemV" => 80,
            "FontFile2" => font_file_id,
        });

        let mut gid_map = Vec::with_capacity((self.chars.len() + 1) * 2);
        gid_map.extend_from_slice(&[0, 0]);
        for &c in &self.chars {
            gid_map.extend_from_slice(&self.glyph(c).0.to_be_bytes());
        }
        let gid_map_id = doc.add_object(Stream::new(dictionary! {}, gid_map));

        let widths: Vec<Object> = self.chars.iter().map(|&c| self.char_width(c).into()).collect();
        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => DEJAVU_SANS_NAME,
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "W" => vec![1.into(), Object::Array(widths)],
            "CIDToGIDMap" => gid_map_id,
        });

        let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, self.to_unicode_cmap().into_bytes()));
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => DEJAVU_SANS_NAME,
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![cid_font_id.into()],
            "ToUnicode" => to_unicode_id,
        })
    }

    fn to_unicode_cmap(&self) -> String {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n\
             <0000> <FFFF>\n\
             endcodespacerange\n",
        );
        for (block_no, block) in self.chars.chunks(BFCHAR_BLOCK).enumerate() {
            let _ = writeln!(cmap, "{} beginbfchar", block.len());
            for (i, &c) in block.iter().enumerate() {
                let cid = block_no * BFCHAR_BLOCK + i + 1;
                let mut units = [0u16; 2];
                let target: String = c
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{u:04X}"))
                    .collect();
                let _ = writeln!(cmap, "<{cid:04X}> <{target}>");
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str(
            "endcmap\n\
             CMapName currentdict /CMap defineresource pop\n\
             end\n\
             end\n",
        );
        cmap
    }
}

// ── WinAnsi and Helvetica metrics ────────────────────────────────────────────

pub(crate) fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => return Some(code as u8),
        _ => {}
    }
    let b = match c {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(b)
}

/// Helvetica advance widths for WinAnsi 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

fn glyph_width(b: u8) -> i64 {
    match b {
        32..=126 => i64::from(HELVETICA_WIDTHS[usize::from(b - 32)]),
        _ => 556,
    }
}
