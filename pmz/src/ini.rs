//! The INI variant used by pMetro files. It differs from standard INI in a
//! few ways: duplicate keys are legal and accumulate into a "composite" slot,
//! a bare `[]` section header stops parsing entirely, keys without `=` are
//! boolean-ish flags, and `\n` inside values means a literal newline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::encoding::read_all_lines;

// Files that legitimately repeat keys (city metadata, image indexes); no
// duplicate-key warning for these.
const DUPLICATES_SAFE_EXTENSIONS: [&str; 2] = ["cty", "txt"];

pub struct IniFile {
    path: PathBuf,
    sections: Vec<IniSection>,
    default_section: IniSection,
}

pub struct IniSection {
    name: String,
    values: BTreeMap<String, String>,
}

impl IniSection {
    fn new(name: String) -> Self {
        Self {
            name,
            values: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    /// Key/value pairs in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, key: String, value: String, warn_duplicates: bool, context: &str) {
        if self.values.contains_key(&key) {
            let composite = composite_name(&key);
            if !self.values.contains_key(&composite) {
                if warn_duplicates {
                    warn!("Duplicate parameter name '{}' found in {}", key, context);
                }
                let seed = self.values[&key].clone();
                self.values.insert(composite.clone(), seed);
            }
            let slot = self.values.get_mut(&composite).unwrap();
            slot.push('\n');
            slot.push_str(&value);
            // The plain key keeps only the most recent occurrence.
            self.values.insert(key, value);
        } else {
            self.values.insert(key, value);
        }
    }
}

fn composite_name(key: &str) -> String {
    format!("__{}_COMPOSITE__", key)
}

impl IniFile {
    pub fn read(path: &Path) -> Result<IniFile> {
        let warn_duplicates = !path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                DUPLICATES_SAFE_EXTENSIONS
                    .iter()
                    .any(|safe| e.eq_ignore_ascii_case(safe))
            })
            .unwrap_or(false);

        let mut ini = IniFile {
            path: path.to_path_buf(),
            sections: Vec::new(),
            default_section: IniSection::new(String::new()),
        };
        // Index into sections; None means the unnamed default section.
        let mut current: Option<usize> = None;
        // Replacement names for empty keys, so data isn't silently dropped.
        let mut auto_key = 0;

        for (idx, raw) in read_all_lines(path)?.iter().enumerate() {
            let pos = idx + 1;
            let line = raw.trim().replace("\\n", "\n");
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            if line == "[]" {
                info!(
                    "Empty section [] detected in {} at line {}, stop reading file",
                    path.display(),
                    pos
                );
                break;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line.trim_matches(|c| c == '[' || c == ']').trim();
                if name.is_empty() {
                    continue;
                }
                // A repeated section header wipes the earlier contents but
                // keeps its position in the file order.
                if let Some(existing) = ini.sections.iter().position(|s| s.name == name) {
                    ini.sections[existing].values.clear();
                    current = Some(existing);
                } else {
                    ini.sections.push(IniSection::new(name.to_string()));
                    current = Some(ini.sections.len() - 1);
                }
                continue;
            }

            let (mut key, value) = match line.find('=') {
                Some(i) => (line[..i].trim().to_string(), line[i + 1..].trim().to_string()),
                None => (line.clone(), "1".to_string()),
            };
            if key.is_empty() {
                auto_key += 1;
                key = format!("__key{}__", auto_key);
            }

            let context = format!("{} at line {}", path.display(), pos);
            let section = match current {
                Some(i) => &mut ini.sections[i],
                None => &mut ini.default_section,
            };
            section.insert(key, value, warn_duplicates, &context);
        }

        if !ini.default_section.values.is_empty() {
            warn!(
                "Some properties not in named section in {}",
                path.display()
            );
        }

        Ok(ini)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sections in file order.
    pub fn sections(&self) -> impl Iterator<Item = &IniSection> {
        self.sections.iter()
    }

    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn sections_with_prefix(&self, prefix: &str) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| s.name.starts_with(prefix))
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn attr(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)?.get(key)
    }

    pub fn attr_or(&self, section: &str, key: &str, default: &str) -> String {
        self.attr(section, key).unwrap_or(default).to_string()
    }

    /// The newline-joined run of every occurrence of a repeated key, falling
    /// back to the plain value when the key wasn't repeated.
    pub fn composite_attr(&self, section: &str, key: &str) -> Option<&str> {
        let s = self.section(section)?;
        s.get(&composite_name(key)).or_else(|| s.get(key))
    }

    pub fn int_attr_or(&self, section: &str, key: &str, default: i32) -> i32 {
        self.attr(section, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn float_attr_or(&self, section: &str, key: &str, default: f64) -> f64 {
        self.attr(section, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn bool_attr_or(&self, section: &str, key: &str, default: bool) -> bool {
        match self.attr(section, key) {
            Some(v) => v.trim().eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    /// All keys of a section starting with a prefix, with their values.
    pub fn attr_collection(&self, section: &str, prefix: &str) -> BTreeMap<String, String> {
        let mut copy = BTreeMap::new();
        if let Some(s) = self.section(section) {
            for (k, v) in s.iter() {
                if k.starts_with(prefix) {
                    copy.insert(k.to_string(), v.to_string());
                }
            }
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_ini(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("pmz-ini-{}-{}", std::process::id(), name));
        fs_err::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn duplicate_keys_keep_latest_and_composite() {
        let path = write_ini("dup.trp", "[A]\nx=1\nx=2\n[B]\ny=3\n");
        let ini = IniFile::read(&path).unwrap();
        assert_eq!(ini.attr("A", "x"), Some("2"));
        assert_eq!(ini.composite_attr("A", "x"), Some("1\n2"));
        assert_eq!(ini.attr("B", "y"), Some("3"));
        // Composite form of a non-repeated key falls back to the plain value.
        assert_eq!(ini.composite_attr("B", "y"), Some("3"));
    }

    #[test]
    fn empty_section_header_stops_parsing() {
        let path = write_ini("stop.trp", "[A]\nx=1\n[]\n[B]\ny=2\n");
        let ini = IniFile::read(&path).unwrap();
        assert_eq!(ini.attr("A", "x"), Some("1"));
        assert!(!ini.has_section("B"));
    }

    #[test]
    fn bare_keys_and_comments() {
        let path = write_ini("bare.trp", "; comment\n[A]\nflag\nx=a\\nb\n");
        let ini = IniFile::read(&path).unwrap();
        assert_eq!(ini.attr("A", "flag"), Some("1"));
        assert_eq!(ini.attr("A", "x"), Some("a\nb"));
    }

    #[test]
    fn sections_keep_file_order() {
        let path = write_ini("order.trp", "[Zebra]\nx=1\n[Alpha]\nx=2\n");
        let ini = IniFile::read(&path).unwrap();
        let names: Vec<&str> = ini.sections().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Zebra", "Alpha"]);
    }

    #[test]
    fn typed_accessors() {
        let path = write_ini("typed.trp", "[O]\nw=9\nd=11.5\nu=True\n");
        let ini = IniFile::read(&path).unwrap();
        assert_eq!(ini.int_attr_or("O", "w", 1), 9);
        assert_eq!(ini.float_attr_or("O", "d", 0.0), 11.5);
        assert!(ini.bool_attr_or("O", "u", false));
        assert!(ini.bool_attr_or("O", "missing", true));
        assert_eq!(ini.int_attr_or("O", "missing", 7), 7);
    }
}
