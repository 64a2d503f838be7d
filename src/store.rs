//! Append-only text log kept alongside the console log
//!
//! The buoy firmware mirrors its measurement results into a file on removable
//! storage. The library only sees [`LogStore`]; a missing or failing card is
//! the implementation's problem and never reaches the analysis.

use core::fmt::{self, Write};

/// File the firmware appends measurement records to
pub const LOG_FILE_NAME: &str = "/Log.txt";

/// Longest line produced by [`LogStore::append_fmt`]; longer lines are dropped
pub const LINE_CAPACITY: usize = 96;

/// Durable line-oriented log sink
pub trait LogStore {
    /// Append one line of text
    fn append_line(&mut self, line: &str);

    /// Format and append one line
    fn append_fmt(&mut self, args: fmt::Arguments<'_>) {
        let mut line: heapless::String<LINE_CAPACITY> = heapless::String::new();
        if line.write_fmt(args).is_ok() {
            self.append_line(&line);
        }
    }
}

/// Store that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl LogStore for NullStore {
    fn append_line(&mut self, _line: &str) {}
}

impl<S: LogStore + ?Sized> LogStore for &mut S {
    fn append_line(&mut self, line: &str) {
        (**self).append_line(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LastLine {
        line: heapless::String<LINE_CAPACITY>,
        count: usize,
    }

    impl LogStore for LastLine {
        fn append_line(&mut self, line: &str) {
            self.line.clear();
            let _ = self.line.push_str(line);
            self.count += 1;
        }
    }

    #[test]
    fn test_append_fmt() {
        let mut store = LastLine {
            line: heapless::String::new(),
            count: 0,
        };
        store.append_fmt(format_args!("AVERAGE WAVE H: {:.2}", 1.2345));
        assert_eq!(store.line.as_str(), "AVERAGE WAVE H: 1.23");
        assert_eq!(store.count, 1);
    }

    #[test]
    fn test_overlong_line_dropped() {
        let mut store = LastLine {
            line: heapless::String::new(),
            count: 0,
        };
        let long = [b'x'; LINE_CAPACITY + 1];
        let text = core::str::from_utf8(&long).unwrap();
        store.append_fmt(format_args!("{}", text));
        assert_eq!(store.count, 0);
    }

    fn append_result<S: LogStore>(mut store: S) {
        store.append_fmt(format_args!("SIGNIFICANT WAVE H: {:.2}", 0.5));
    }

    #[test]
    fn test_store_through_reference() {
        let mut store = LastLine {
            line: heapless::String::new(),
            count: 0,
        };
        append_result(&mut store);
        append_result(NullStore);
        assert_eq!(store.line.as_str(), "SIGNIFICANT WAVE H: 0.50");
    }
}
