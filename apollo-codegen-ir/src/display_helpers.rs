use std::fmt;
use std::fmt::Display;

use serde::Serializer;

/// Two-space indented output for rendering selection sets.
pub(crate) struct Indented<'a, 'f> {
    depth: usize,
    out: &'a mut fmt::Formatter<'f>,
}

impl<'a, 'f> Indented<'a, 'f> {
    pub(crate) fn new(out: &'a mut fmt::Formatter<'f>) -> Self {
        Self { depth: 0, out }
    }

    pub(crate) fn push(&mut self, value: impl Display) -> fmt::Result {
        write!(self.out, "{value}")
    }

    fn line_break(&mut self) -> fmt::Result {
        writeln!(self.out)?;
        write!(self.out, "{:width$}", "", width = self.depth * 2)
    }

    /// Writes `{`, one line per item one level deeper, then `}`. An empty block is `{}`.
    pub(crate) fn block<T>(
        &mut self,
        items: impl IntoIterator<Item = T>,
        mut write_item: impl FnMut(&mut Self, T) -> fmt::Result,
    ) -> fmt::Result {
        self.push("{")?;
        self.depth += 1;
        let mut empty = true;
        for item in items {
            empty = false;
            self.line_break()?;
            write_item(self, item)?;
        }
        self.depth -= 1;
        if !empty {
            self.line_break()?;
        }
        self.push("}")
    }
}

/// Displays items one after another with `separator` between them.
pub(crate) struct Joined<'a, T> {
    pub(crate) items: &'a [T],
    pub(crate) separator: &'static str,
}

impl<T: Display> Display for Joined<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, item) in self.items.iter().enumerate() {
            if index > 0 {
                f.write_str(self.separator)?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

pub(crate) fn serialize_as_string<T: Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
