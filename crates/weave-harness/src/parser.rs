//! Instrumented markup parser.

use std::cell::{Cell, RefCell};

use weave_markup::{Fragment, FragmentParser, MarkupParser, ParseError};

/// Wraps a parser and counts every call.
#[derive(Debug, Default)]
pub struct CountingParser<P = FragmentParser> {
    inner: P,
    calls: Cell<usize>,
    sources: RefCell<Vec<String>>,
}

impl CountingParser<FragmentParser> {
    #[must_use]
    pub fn new() -> Self {
        Self::wrap(FragmentParser::new())
    }
}

impl<P> CountingParser<P> {
    pub fn wrap(inner: P) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
            sources: RefCell::new(Vec::new()),
        }
    }

    /// Number of `parse_fragment` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Every source handed to the parser, in call order.
    #[must_use]
    pub fn sources(&self) -> Vec<String> {
        self.sources.borrow().clone()
    }

    /// How many times `markup` was parsed.
    #[must_use]
    pub fn calls_for(&self, markup: &str) -> usize {
        self.sources.borrow().iter().filter(|s| *s == markup).count()
    }

    pub fn reset(&self) {
        self.calls.set(0);
        self.sources.borrow_mut().clear();
    }
}

impl<P: MarkupParser> MarkupParser for CountingParser<P> {
    fn parse_fragment(&self, markup: &str) -> Result<Fragment, ParseError> {
        self.calls.set(self.calls.get() + 1);
        self.sources.borrow_mut().push(markup.to_string());
        tracing::trace!(call = self.calls.get(), "counting parser invoked");
        self.inner.parse_fragment(markup)
    }
}
