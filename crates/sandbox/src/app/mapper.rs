//! Mapping validator byte offsets onto line/column coordinates.

use crate::domain::model::{BuildError, ErrorCoordinate};
use crate::domain::wire::WireBuildError;

/// Locate `offset` inside `text`.
///
/// The line is the number of `\n` bytes before `offset` and the column is the byte
/// distance from the start of that line. Offsets past the end clamp to `text.len()`.
pub fn offset_to_coordinate(text: &str, offset: usize) -> ErrorCoordinate {
    let offset = offset.min(text.len());
    let before = &text.as_bytes()[..offset];

    let line = before.iter().filter(|byte| **byte == b'\n').count();
    let line_start = before
        .iter()
        .rposition(|byte| *byte == b'\n')
        .map(|idx| idx + 1)
        .unwrap_or(0);

    ErrorCoordinate::new(line, offset - line_start)
}

/// Coordinates of both ends of a byte range.
pub fn span_coordinates(
    text: &str,
    start: usize,
    end: usize,
) -> (ErrorCoordinate, ErrorCoordinate) {
    (
        offset_to_coordinate(text, start),
        offset_to_coordinate(text, end),
    )
}

/// Turn a validator diagnostic into a [`BuildError`] for `text`.
///
/// Server coordinates are trusted when present; only missing ones are derived. An
/// inverted range collapses onto its start offset.
pub fn resolve_build_error(wire: WireBuildError, text: &str) -> BuildError {
    let start_offset = wire.start_offset;
    let end_offset = wire.end_offset.max(start_offset);

    let (start_coordinate, end_coordinate) = match (wire.start_coordinates, wire.end_coordinates) {
        (Some(start), Some(end)) => (start, end),
        (start, end) => {
            let (derived_start, derived_end) = span_coordinates(text, start_offset, end_offset);
            (start.unwrap_or(derived_start), end.unwrap_or(derived_end))
        }
    };

    BuildError {
        start_offset,
        end_offset,
        start_coordinate,
        end_coordinate,
        message: wire.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_line_starts() {
        let text = "ab\ncd\nef";
        assert_eq!(offset_to_coordinate(text, 0), ErrorCoordinate::new(0, 0));
        assert_eq!(offset_to_coordinate(text, 3), ErrorCoordinate::new(1, 0));
        assert_eq!(offset_to_coordinate(text, 6), ErrorCoordinate::new(2, 0));
    }

    #[test]
    fn newline_belongs_to_the_line_it_ends() {
        let text = "ab\ncd";
        assert_eq!(offset_to_coordinate(text, 2), ErrorCoordinate::new(0, 2));
        assert_eq!(offset_to_coordinate(text, 4), ErrorCoordinate::new(1, 1));
    }

    #[test]
    fn offsets_past_the_end_clamp() {
        let text = "ab\nc";
        assert_eq!(offset_to_coordinate(text, 99), ErrorCoordinate::new(1, 1));
        assert_eq!(offset_to_coordinate("", 5), ErrorCoordinate::new(0, 0));
    }

    #[test]
    fn carriage_returns_count_as_columns() {
        let text = "a\r\nb";
        assert_eq!(offset_to_coordinate(text, 2), ErrorCoordinate::new(0, 2));
        assert_eq!(offset_to_coordinate(text, 3), ErrorCoordinate::new(1, 0));
    }

    #[test]
    fn columns_are_byte_distances() {
        let text = "é\nxé";
        // 'é' is two bytes, so the second line starts at byte 3.
        assert_eq!(offset_to_coordinate(text, 3), ErrorCoordinate::new(1, 0));
        assert_eq!(offset_to_coordinate(text, 4), ErrorCoordinate::new(1, 1));
    }

    #[test]
    fn mapping_is_monotonic() {
        let text = "{{ name }}\n\n  {{ value | upper }}\nend\n";
        let coordinates: Vec<_> = (0..=text.len())
            .map(|offset| offset_to_coordinate(text, offset))
            .collect();
        assert!(coordinates.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn resolve_keeps_server_coordinates() {
        let wire = WireBuildError {
            start_offset: 0,
            end_offset: 2,
            start_coordinates: Some(ErrorCoordinate::new(7, 7)),
            end_coordinates: None,
            message: "bad".into(),
        };
        let error = resolve_build_error(wire, "hi");
        assert_eq!(error.start_coordinate, ErrorCoordinate::new(7, 7));
        assert_eq!(error.end_coordinate, ErrorCoordinate::new(0, 2));
    }

    #[test]
    fn resolve_collapses_inverted_ranges() {
        let wire = WireBuildError {
            start_offset: 4,
            end_offset: 1,
            message: "odd".into(),
            ..WireBuildError::default()
        };
        let error = resolve_build_error(wire, "ab\ncd");
        assert_eq!(error.end_offset, 4);
        assert_eq!(
            span_coordinates("ab\ncd", 4, 4),
            (error.start_coordinate, error.end_coordinate)
        );
    }
}
