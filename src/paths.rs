//! Classification of the slash-delimited paths served by the directory
//! listing. The archive layout is fixed: the first three segments address
//! an instrument, an optional fourth names the experimenter, and whatever
//! remains names the data unit itself.

/// Minimum number of segments a path needs to qualify as an ingest source.
/// Anything shorter addresses a whole instrument or above.
pub const MIN_SOURCE_SEGMENTS: usize = 4;

/// Labeled breakdown of one directory path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryInfo {
    /// Instrument name, taken from the third segment.
    pub instrument: Option<String>,
    /// Experimenter name; present only for five-segment paths.
    pub experimenter: Option<String>,
    /// The remaining segments joined back together.
    pub data_label: Option<String>,
}

/// Split a path into the levels used by the directory picker. Short paths
/// yield empty fields rather than failing.
pub fn classify(path: &str) -> DirectoryInfo {
    let segments: Vec<&str> = path.split('/').collect();

    let instrument = segments.get(2).map(|s| s.to_string());
    let (experimenter, rest) = match segments.len() {
        5 => (segments.get(3).map(|s| s.to_string()), &segments[4..]),
        n if n > 3 => (None, &segments[3..]),
        _ => (None, &segments[..0]),
    };

    let data_label = match rest.is_empty() {
        true => None,
        false => Some(rest.join("/")),
    };

    DirectoryInfo {
        instrument,
        experimenter,
        data_label,
    }
}

/// Whether a path is deep enough to be archived on its own. Guards against
/// submitting an entire instrument's worth of data.
pub fn is_ingest_source(path: &str) -> bool {
    path.split('/').count() >= MIN_SOURCE_SEGMENTS
}

/// The short label used by flat pickers: the instrument name plus the
/// final path segment.
pub fn option_label(path: &str) -> String {
    let info = classify(path);
    let instrument = info.instrument.unwrap_or_default();
    let dir = path.split('/').next_back().unwrap_or_default();
    format!("Instrument: {instrument} Dir: {dir}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_segments_name_an_experimenter() {
        let info = classify("root/inst/NMR4/alice/run7");
        assert_eq!(info.instrument.as_deref(), Some("NMR4"));
        assert_eq!(info.experimenter.as_deref(), Some("alice"));
        assert_eq!(info.data_label.as_deref(), Some("run7"));
    }

    #[test]
    fn four_segments_skip_the_experimenter() {
        let info = classify("root/inst/NMR4/run2");
        assert_eq!(info.instrument.as_deref(), Some("NMR4"));
        assert_eq!(info.experimenter, None);
        assert_eq!(info.data_label.as_deref(), Some("run2"));
    }

    #[test]
    fn deep_paths_join_the_tail() {
        let info = classify("root/inst/NMR4/2026/02/run9");
        assert_eq!(info.instrument.as_deref(), Some("NMR4"));
        assert_eq!(info.experimenter, None);
        assert_eq!(info.data_label.as_deref(), Some("2026/02/run9"));
    }

    #[test]
    fn short_paths_yield_empty_fields() {
        assert_eq!(classify(""), DirectoryInfo::default());
        assert_eq!(classify("root/inst"), DirectoryInfo::default());

        let info = classify("root/inst/NMR4");
        assert_eq!(info.instrument.as_deref(), Some("NMR4"));
        assert_eq!(info.experimenter, None);
        assert_eq!(info.data_label, None);
    }

    #[test]
    fn source_rule_requires_more_than_an_instrument() {
        assert!(!is_ingest_source("root/inst/NMR4"));
        assert!(is_ingest_source("root/inst/NMR4/run2"));
        assert!(is_ingest_source("root/inst/NMR4/alice/run7"));
    }

    #[test]
    fn option_labels_show_instrument_and_final_segment() {
        assert_eq!(
            option_label("root/inst/NMR4/alice/run7"),
            "Instrument: NMR4 Dir: run7"
        );
        assert_eq!(option_label("root/inst"), "Instrument:  Dir: inst");
    }
}
