use anyhow::{anyhow, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

use crate::config::OcrSettings;

/// A recognized word with its Tesseract grouping keys.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    pub text: String,
    pub confidence: f32,
    pub block: i32,
    pub paragraph: i32,
    pub line: i32,
}

impl OcrToken {
    fn line_key(&self) -> (i32, i32, i32) {
        (self.block, self.paragraph, self.line)
    }
}

/// A recognized glyph with its bounding rectangle (y grows upward).
#[derive(Debug, Clone, PartialEq)]
pub struct CharBox {
    pub glyph: String,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl CharBox {
    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.bottom + self.top) / 2.0
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

/// Source of raw OCR output for an image.
pub trait Recognizer {
    /// Word-level recognition under page segmentation mode `psm`.
    fn recognize_tokens(&self, image: &[u8], psm: &str) -> Result<Vec<OcrToken>>;

    /// Character-level recognition with bounding boxes.
    fn recognize_boxes(&self, image: &[u8]) -> Result<Vec<CharBox>>;
}

/// Recognizer that shells out to the tesseract executable.
pub struct TesseractCli {
    settings: OcrSettings,
}

impl TesseractCli {
    pub fn new(settings: OcrSettings) -> Self {
        Self { settings }
    }

    /// Writes the image to a temporary file and runs tesseract on it,
    /// returning stdout.
    fn run(&self, image: &[u8], extra: &[&str]) -> Result<String> {
        let mut temp_input = NamedTempFile::with_suffix(".png")?;
        temp_input.write_all(image)?;
        temp_input.flush()?;

        let output = Command::new(&self.settings.tesseract)
            .arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.settings.lang)
            .args(extra)
            .output()
            .map_err(|e| anyhow!("Failed to run {}: {}", self.settings.tesseract, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Recognizer for TesseractCli {
    fn recognize_tokens(&self, image: &[u8], psm: &str) -> Result<Vec<OcrToken>> {
        let tsv = self.run(image, &["--psm", psm, "tsv"])?;
        parse_tsv_output(&tsv)
    }

    fn recognize_boxes(&self, image: &[u8]) -> Result<Vec<CharBox>> {
        let boxes = self.run(image, &["makebox"])?;
        Ok(parse_box_output(&boxes))
    }
}

/// Recognizer that shells out to kraken.
///
/// Kraken produces plain text lines only, so there is no token grouping or
/// box pass to fall back on.
pub struct KrakenCli {
    settings: OcrSettings,
}

impl KrakenCli {
    pub fn new(settings: OcrSettings) -> Self {
        Self { settings }
    }

    /// Arguments for `kraken -i <input> - segment -bl ocr [-m <model>]`,
    /// printing the recognized text on stdout.
    fn args(&self, input: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-i".into(),
            input.as_os_str().to_owned(),
            "-".into(),
            "segment".into(),
            "-bl".into(),
            "ocr".into(),
        ];
        if let Some(model) = &self.settings.kraken_model {
            args.push("-m".into());
            args.push(model.into());
        }
        args
    }

    pub fn recognize_text(&self, image: &[u8]) -> Result<String> {
        let mut temp_input = NamedTempFile::with_suffix(".png")?;
        temp_input.write_all(image)?;
        temp_input.flush()?;

        let output = Command::new(&self.settings.kraken)
            .args(self.args(temp_input.path()))
            .output()
            .map_err(|e| anyhow!("Failed to run {}: {}", self.settings.kraken, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Kraken failed: {}", stderr));
        }

        Ok(parse_kraken_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Normalizes kraken's line output: trailing whitespace trimmed, blank lines
/// dropped.
pub fn parse_kraken_output(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses Tesseract TSV output into word tokens.
///
/// Keeps word rows (level 5) only. Rows with negative confidence or empty
/// text are discarded.
pub fn parse_tsv_output(tsv: &str) -> Result<Vec<OcrToken>> {
    let mut tokens = Vec::new();

    for line in tsv.lines().skip(1) {
        // Skip header
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        let text = fields[11].trim();
        if conf < 0.0 || text.is_empty() {
            continue;
        }

        let key = |i: usize| -> Result<i32> {
            fields[i]
                .trim()
                .parse()
                .map_err(|e| anyhow!("Bad grouping key '{}' in TSV row: {}", fields[i], e))
        };

        tokens.push(OcrToken {
            text: text.to_string(),
            confidence: conf,
            block: key(2)?,
            paragraph: key(3)?,
            line: key(4)?,
        });
    }

    Ok(tokens)
}

/// Joins tokens into text: words of one (block, paragraph, line) group are
/// space-separated, groups are newline-separated, in first-seen order.
pub fn tokens_to_text(tokens: &[OcrToken]) -> String {
    let mut lines: Vec<((i32, i32, i32), Vec<&str>)> = Vec::new();

    for token in tokens {
        let key = token.line_key();
        match lines.iter_mut().find(|(k, _)| *k == key) {
            Some((_, words)) => words.push(&token.text),
            None => lines.push((key, vec![&token.text])),
        }
    }

    lines
        .iter()
        .map(|(_, words)| words.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses Tesseract box output: `glyph left bottom right top page` per line.
/// Malformed lines are skipped.
pub fn parse_box_output(boxes: &str) -> Vec<CharBox> {
    boxes
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                return None;
            }
            let coord = |i: usize| fields[i].parse::<f32>().ok();
            Some(CharBox {
                glyph: fields[0].to_string(),
                left: coord(1)?,
                bottom: coord(2)?,
                right: coord(3)?,
                top: coord(4)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn row(level: i32, block: i32, par: i32, line: i32, word: i32, conf: &str, text: &str) -> String {
        format!(
            "{}\t1\t{}\t{}\t{}\t{}\t0\t0\t10\t10\t{}\t{}",
            level, block, par, line, word, conf, text
        )
    }

    fn make_token(text: &str, block: i32, paragraph: i32, line: i32) -> OcrToken {
        OcrToken {
            text: text.to_string(),
            confidence: 90.0,
            block,
            paragraph,
            line,
        }
    }

    #[test]
    fn test_parse_tsv_words_only() {
        let tsv = [
            HEADER.to_string(),
            row(1, 0, 0, 0, 0, "-1", ""),
            row(4, 1, 1, 1, 0, "-1", ""),
            row(5, 1, 1, 1, 1, "91.5", "lorem"),
            row(5, 1, 1, 1, 2, "88", "ipsum"),
        ]
        .join("\n");

        let tokens = parse_tsv_output(&tsv).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "lorem");
        assert_eq!(tokens[0].confidence, 91.5);
        assert_eq!(tokens[1].text, "ipsum");
    }

    #[test]
    fn test_parse_tsv_drops_negative_confidence_and_empty() {
        let tsv = [
            HEADER.to_string(),
            row(5, 1, 1, 1, 1, "-1", "ghost"),
            row(5, 1, 1, 1, 2, "75", " "),
            row(5, 1, 1, 1, 3, "0", "kept"),
        ]
        .join("\n");

        let tokens = parse_tsv_output(&tsv).unwrap();
        assert_eq!(tokens, vec![OcrToken { confidence: 0.0, ..make_token("kept", 1, 1, 1) }]);
    }

    #[test]
    fn test_parse_tsv_short_rows_skipped() {
        let tsv = format!("{}\n5\t1\t1\n", HEADER);
        assert!(parse_tsv_output(&tsv).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tsv_bad_grouping_key() {
        let tsv = format!("{}\n5\t1\tx\t1\t1\t1\t0\t0\t10\t10\t90\tword", HEADER);
        assert!(parse_tsv_output(&tsv).is_err());
    }

    #[test]
    fn test_tokens_grouped_by_line() {
        let tokens = vec![
            make_token("arma", 1, 1, 1),
            make_token("virumque", 1, 1, 1),
            make_token("cano", 1, 1, 2),
            make_token("troiae", 2, 1, 1),
            make_token("qui", 1, 1, 2),
        ];
        assert_eq!(tokens_to_text(&tokens), "arma virumque\ncano qui\ntroiae");
    }

    #[test]
    fn test_tokens_to_text_empty() {
        assert_eq!(tokens_to_text(&[]), "");
    }

    #[test]
    fn test_parse_box_output() {
        let boxes = parse_box_output("a 0 0 5 5 0\nb 6 0 11 5 0\nbroken line\n");
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[1].glyph, "b");
        assert_eq!(boxes[1].left, 6.0);
        assert_eq!(boxes[1].top, 5.0);
        assert_eq!(boxes[1].center_x(), 8.5);
        assert_eq!(boxes[1].width(), 5.0);
        assert_eq!(boxes[1].height(), 5.0);
    }

    #[test]
    fn test_parse_box_non_numeric_skipped() {
        assert!(parse_box_output("a 0 zero 5 5 0").is_empty());
    }

    #[test]
    fn test_tesseract_missing_executable() {
        let recognizer = TesseractCli::new(OcrSettings {
            tesseract: "/nonexistent/tesseract".to_string(),
            ..OcrSettings::default()
        });
        assert!(recognizer.recognize_tokens(b"not an image", "6").is_err());
        assert!(recognizer.recognize_boxes(b"not an image").is_err());
    }

    #[test]
    fn test_parse_kraken_output() {
        let stdout = "Gallia est omnis  \n\n   \ndivisa in partes tres\n";
        assert_eq!(
            parse_kraken_output(stdout),
            "Gallia est omnis\ndivisa in partes tres"
        );
        assert_eq!(parse_kraken_output(""), "");
    }

    #[test]
    fn test_kraken_args() {
        let input = Path::new("/tmp/page.png");
        let plain = KrakenCli::new(OcrSettings::default());
        assert_eq!(
            plain.args(input),
            ["-i", "/tmp/page.png", "-", "segment", "-bl", "ocr"]
                .map(OsString::from)
                .to_vec()
        );

        let with_model = KrakenCli::new(OcrSettings {
            kraken_model: Some("latin.mlmodel".to_string()),
            ..OcrSettings::default()
        });
        let args = with_model.args(input);
        assert_eq!(&args[6..], &[OsString::from("-m"), OsString::from("latin.mlmodel")]);
    }

    #[test]
    fn test_kraken_missing_executable() {
        let recognizer = KrakenCli::new(OcrSettings {
            kraken: "/nonexistent/kraken".to_string(),
            ..OcrSettings::default()
        });
        assert!(recognizer.recognize_text(b"not an image").is_err());
    }
}
