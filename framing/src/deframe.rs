/// A trait for converting a stream of text chunks into frames.
///
/// Chunks arrive with arbitrary boundaries: a frame may be split across
/// several chunks and one chunk may carry several frames. Implementors keep
/// the unconsumed text in an internal buffer between calls, so a deframer is
/// bound to a single stream and must not be shared between connections.
///
/// # Type Parameters
///
/// * `Frame` - The type of frames to be produced (e.g. [`RawFrame`](crate::RawFrame))
pub trait Deframer {
    /// The type of frames yielded by this deframer.
    type Frame;

    /// Appends a chunk of incoming text to the internal buffer.
    fn push(&mut self, chunk: &str);

    /// Extracts the next complete frame from the internal buffer, if any.
    ///
    /// Returns `None` once the buffer holds no complete frame; whatever
    /// remains is kept for the next call to [`push`](Deframer::push).
    fn next_frame(&mut self) -> Option<Self::Frame>;

    /// Appends `chunk` and returns an iterator over the frames it completed.
    ///
    /// This method does not perform any deframing immediately. The returned
    /// iterator extracts frames lazily as they are requested; frames left
    /// unrequested when it is dropped stay in the buffer.
    fn feed<'a>(&'a mut self, chunk: &str) -> Feed<'a, Self>
    where
        Self: Sized,
    {
        self.push(chunk);
        Feed { deframer: self }
    }

    /// Creates an iterator that converts a stream of chunks into frames.
    ///
    /// # Arguments
    ///
    /// * `input` - An iterator of text chunks to be deframed
    ///
    /// # Returns
    ///
    /// An iterator that yields frames as they are completed by the input.
    fn frames<I>(self, input: I) -> Frames<I, Self>
    where
        Self: Sized,
        I: Iterator,
        I::Item: AsRef<str>,
    {
        Frames {
            input,
            deframer: self,
        }
    }
}

/// Frames completed by a single [`Deframer::feed`] call.
pub struct Feed<'a, D> {
    deframer: &'a mut D,
}

impl<D: Deframer> Iterator for Feed<'_, D> {
    type Item = D::Frame;

    fn next(&mut self) -> Option<Self::Item> {
        self.deframer.next_frame()
    }
}

/// Frames extracted from an iterator of chunks, see [`Deframer::frames`].
pub struct Frames<I, D> {
    input: I,
    deframer: D,
}

impl<I, D> Frames<I, D> {
    /// Gives back the deframer, including any partial frame it still holds.
    pub fn into_inner(self) -> D {
        self.deframer
    }
}

impl<I, D> Iterator for Frames<I, D>
where
    I: Iterator,
    I::Item: AsRef<str>,
    D: Deframer,
{
    type Item = D::Frame;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(frame) = self.deframer.next_frame() {
                return Some(frame);
            }

            let chunk = self.input.next()?;
            self.deframer.push(chunk.as_ref());
        }
    }
}
