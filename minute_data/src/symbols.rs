//! Exchange symbol to company name lookup

use crate::{DataError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Symbol/company directory read from an equity listing CSV
#[derive(Debug, Clone, Default)]
pub struct SymbolDirectory {
    names: HashMap<String, String>,
}

impl SymbolDirectory {
    /// Load a listing with `SYMBOL` and `NAME OF COMPANY` columns
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            DataError::DataLoadError(format!(
                "Failed to open equity list {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_reader(file)
    }

    /// Parse a listing from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_uppercase())
            .collect();
        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                DataError::DataLoadError(format!("Equity list has no '{}' column", name))
            })
        };
        let symbol_idx = column("SYMBOL")?;
        let name_idx = column("NAME OF COMPANY")?;

        let mut names = HashMap::new();
        for record in reader.records() {
            let record = record?;
            if let (Some(symbol), Some(name)) = (record.get(symbol_idx), record.get(name_idx)) {
                if !symbol.is_empty() {
                    names.insert(symbol.to_string(), name.to_string());
                }
            }
        }

        log::debug!("Loaded {} symbols", names.len());
        Ok(Self { names })
    }

    /// Build a directory from `(symbol, company)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            names: pairs
                .into_iter()
                .map(|(s, n)| (s.into(), n.into()))
                .collect(),
        }
    }

    /// Number of listed symbols
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the listing holds no symbols
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Company name for an exact symbol
    pub fn company(&self, symbol: &str) -> Option<&str> {
        self.names.get(symbol).map(String::as_str)
    }

    /// Find the symbol whose name appears in the file name of `path`.
    ///
    /// Matching is case-insensitive and the longest matching symbol wins, so
    /// `TCS_minute.csv` resolves to `TCS` even when `TC` is also listed.
    pub fn lookup_path<P: AsRef<Path>>(&self, path: P) -> Option<(&str, &str)> {
        let file_name = path.as_ref().file_name()?.to_string_lossy().to_lowercase();

        self.names
            .iter()
            .filter(|(symbol, _)| file_name.contains(&symbol.to_lowercase()))
            .max_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| b.0.cmp(a.0)))
            .map(|(symbol, name)| (symbol.as_str(), name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reader() {
        let csv = "SYMBOL,NAME OF COMPANY, SERIES\n\
                   INFY,Infosys Limited,EQ\n\
                   TCS,Tata Consultancy Services Limited,EQ\n";
        let dir = SymbolDirectory::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(dir.len(), 2);
        assert!(!dir.is_empty());
        assert_eq!(dir.company("INFY"), Some("Infosys Limited"));

        let empty = SymbolDirectory::from_reader("SYMBOL,NAME OF COMPANY\n".as_bytes()).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
    }

    #[test]
    fn test_missing_columns() {
        let csv = "TICKER,NAME\nINFY,Infosys\n";
        assert!(SymbolDirectory::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_lookup_prefers_longest_symbol() {
        let dir = SymbolDirectory::from_pairs(vec![
            ("TC", "Short"),
            ("TCS", "Tata Consultancy Services Limited"),
            ("INFY", "Infosys Limited"),
        ]);

        let hit = dir.lookup_path("DATA/NIFTY/tcs_minute.csv").unwrap();
        assert_eq!(hit.0, "TCS");

        // directory names are not considered
        assert!(dir.lookup_path("INFY/other.csv").is_none());
    }
}
