use crate::{DeserializeError, Token};

/// A pull-based producer of tokens, typically a format tokenizer.
pub trait TokenSource {
    /// Produce the next token, or `None` at end of input.
    fn next_token(&mut self) -> Result<Option<Token>, DeserializeError>;
}

impl<S: TokenSource + ?Sized> TokenSource for &mut S {
    fn next_token(&mut self) -> Result<Option<Token>, DeserializeError> {
        (**self).next_token()
    }
}

impl<S: TokenSource + ?Sized> TokenSource for Box<S> {
    fn next_token(&mut self) -> Result<Option<Token>, DeserializeError> {
        (**self).next_token()
    }
}

/// Adapts any iterator of tokens into a [`TokenSource`].
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Token>,
{
    /// Wrap an iterator.
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: iter.into_iter(),
        }
    }
}

impl<I> TokenSource for IterSource<I>
where
    I: Iterator<Item = Token>,
{
    fn next_token(&mut self) -> Result<Option<Token>, DeserializeError> {
        Ok(self.iter.next())
    }
}
