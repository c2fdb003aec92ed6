use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::SourceType;
use std::path::Path;

/// Reject engine output that no longer parses.
///
/// Only enforced when the original chunk parsed cleanly: a chunk that was never
/// valid for our parser gives no baseline to compare against.
pub(crate) fn check_output(path: &Path, original: &str, optimized: &str) -> Result<(), String> {
    if parses_cleanly(path, optimized) {
        trace!("Optimized output of {} parses", path.display());
        return Ok(());
    }
    if !parses_cleanly(path, original) {
        debug!("Original {} does not parse either, accepting engine output", path.display());
        return Ok(());
    }
    Err("optimized output failed to parse".to_string())
}

fn parses_cleanly(path: &Path, source: &str) -> bool {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_default();
    let ParserReturn { errors, panicked, .. } =
        OxcParser::new(&allocator, source, source_type).parse();
    !panicked && errors.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_output_is_accepted() {
        let path = Path::new("libX.js");
        assert!(check_output(path, "var a = 1; var b = 2;", "var a = 1;").is_ok());
    }

    #[test]
    fn test_broken_output_is_rejected() {
        let path = Path::new("libX.js");
        let err = check_output(path, "var a = 1;", "var a = ;").unwrap_err();
        assert!(err.contains("failed to parse"));
    }

    #[test]
    fn test_unparsable_original_gives_no_baseline() {
        let path = Path::new("libX.js");
        assert!(check_output(path, "var = ;", "var = ; also broken (").is_ok());
    }
}
