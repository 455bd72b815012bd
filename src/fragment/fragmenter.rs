//! Outbound helper that splits messages into header-tagged frames.
//!
//! [`Fragmenter`] turns a buffer into a lazy [`Fragments`] sequence and can
//! push that sequence through a [`FrameLink`] directly. Frames are assembled
//! in a scratch buffer owned by the fragmenter, so transmitting never touches
//! the receive pool.

use std::iter::FusedIterator;

use bytes::{BufMut, BytesMut};
use tracing::trace;

use super::{FragmentHeader, FragmentOffset, HEADER_LEN, MessageId};
use crate::{
    config::PoolConfig,
    error::{ConfigError, TransmitError},
    host::FrameLink,
    metrics::{self, Direction},
};

/// Splits messages into frames of at most `max_frame_size` bytes.
#[derive(Debug)]
pub struct Fragmenter {
    frame_size: usize,
    max_fragments: usize,
    pacing_ms: u32,
    next_message_id: MessageId,
    scratch: BytesMut,
}

impl Fragmenter {
    /// Create a fragmenter for `config`. Fallback identifiers start at zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation.
    pub fn new(config: &PoolConfig) -> Result<Self, ConfigError> {
        Self::with_starting_id(config, MessageId::new(0))
    }

    /// Create a fragmenter whose fallback identifiers start at `start_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation.
    pub fn with_starting_id(config: &PoolConfig, start_at: MessageId) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            frame_size: config.max_frame_size,
            max_fragments: config.pool_size,
            pacing_ms: config.fragment_pacing_ms(),
            next_message_id: start_at,
            scratch: BytesMut::with_capacity(config.max_frame_size),
        })
    }

    /// Payload bytes carried by a full frame.
    #[must_use]
    pub const fn max_payload(&self) -> usize { self.frame_size - HEADER_LEN }

    /// Largest buffer accepted by [`Self::fragments`] and [`Self::transmit`].
    #[must_use]
    pub const fn max_message_len(&self) -> usize { self.max_fragments * self.max_payload() }

    /// Pick the identifier for the next message.
    ///
    /// The link's random source wins when it has one. Otherwise the
    /// identifier after the previously issued one is used, wrapping at
    /// `u16::MAX`.
    pub fn next_message_id<L: FrameLink + ?Sized>(&mut self, link: &mut L) -> MessageId {
        let id = link.random_id().map_or(self.next_message_id, MessageId::new);
        self.next_message_id = id.wrapping_next();
        id
    }

    /// Split `payload` into frames tagged with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TransmitError::EmptyMessage`] for an empty buffer and
    /// [`TransmitError::MessageTooLarge`] when the receiver's pool could not
    /// hold every fragment.
    pub fn fragments<'a>(
        &self,
        id: MessageId,
        payload: &'a [u8],
    ) -> Result<Fragments<'a>, TransmitError> {
        self.check_len(payload.len())?;
        Ok(Fragments::new(id, payload, self.frame_size))
    }

    /// Fragment `payload` under a fresh identifier and send every frame.
    ///
    /// # Errors
    ///
    /// See [`Self::fragments`]. Nothing is sent and no identifier is consumed
    /// when the buffer is rejected.
    pub fn transmit<L: FrameLink + ?Sized>(
        &mut self,
        link: &mut L,
        payload: &[u8],
    ) -> Result<MessageId, TransmitError> {
        self.check_len(payload.len())?;
        let id = self.next_message_id(link);
        self.transmit_with_id(link, id, payload)?;
        Ok(id)
    }

    /// Fragment `payload` under `id` and send every frame.
    ///
    /// # Errors
    ///
    /// See [`Self::fragments`].
    pub fn transmit_with_id<L: FrameLink + ?Sized>(
        &mut self,
        link: &mut L,
        id: MessageId,
        payload: &[u8],
    ) -> Result<(), TransmitError> {
        let mut fragments = self.fragments(id, payload)?.peekable();
        while let Some(fragment) = fragments.next() {
            fragment.write_to(&mut self.scratch);
            trace!(
                message_id = %id,
                offset = %fragment.header().offset(),
                len = self.scratch.len(),
                "sending fragment"
            );
            link.send_frame(&self.scratch);
            metrics::inc_frames(Direction::Outbound);
            if fragments.peek().is_some() && self.pacing_ms > 0 {
                link.delay_ms(self.pacing_ms);
            }
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<(), TransmitError> {
        if len == 0 {
            return Err(TransmitError::EmptyMessage);
        }
        let limit = self.max_message_len();
        if len > limit {
            return Err(TransmitError::MessageTooLarge { len, limit });
        }
        Ok(())
    }
}

/// One outbound frame: a header and a borrowed slice of the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentFrame<'a> {
    header: FragmentHeader,
    payload: &'a [u8],
}

impl<'a> FragmentFrame<'a> {
    /// Return the fragment header.
    #[must_use]
    pub const fn header(&self) -> &FragmentHeader { &self.header }

    /// Return the payload slice.
    #[must_use]
    pub const fn payload(&self) -> &'a [u8] { self.payload }

    /// Encoded length of the frame.
    #[must_use]
    pub const fn encoded_len(&self) -> usize { HEADER_LEN + self.payload.len() }

    /// Replace the contents of `buf` with the encoded frame.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.clear();
        buf.reserve(self.encoded_len());
        buf.put_slice(&self.header.encode());
        buf.put_slice(self.payload);
    }

    /// Encode the frame into a fresh vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(&self.header.encode());
        buf.extend_from_slice(self.payload);
        buf
    }
}

/// Lazy sequence of frames for one message.
///
/// Created by [`Fragmenter::fragments`].
#[derive(Clone, Debug)]
pub struct Fragments<'a> {
    id: MessageId,
    payload: &'a [u8],
    frame_size: usize,
    index: usize,
    total: usize,
}

impl<'a> Fragments<'a> {
    fn new(id: MessageId, payload: &'a [u8], frame_size: usize) -> Self {
        let chunk = frame_size - HEADER_LEN;
        Self {
            id,
            payload,
            frame_size,
            index: 0,
            total: payload.len().div_ceil(chunk),
        }
    }

    /// Identifier shared by every frame of the sequence.
    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.id }

    /// Whether the message needs more than one frame.
    #[must_use]
    pub const fn is_fragmented(&self) -> bool { self.total > 1 }

    fn header_for(&self, index: usize) -> Option<FragmentHeader> {
        if self.total == 1 {
            return Some(FragmentHeader::unfragmented(self.id));
        }
        let offset = FragmentOffset::for_fragment(index, self.frame_size)?;
        if index + 1 == self.total {
            Some(FragmentHeader::terminal(self.id, offset))
        } else {
            Some(FragmentHeader::non_terminal(self.id, offset))
        }
    }
}

impl<'a> Iterator for Fragments<'a> {
    type Item = FragmentFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total {
            return None;
        }
        let chunk = self.frame_size - HEADER_LEN;
        let start = self.index * chunk;
        let end = (start + chunk).min(self.payload.len());
        let header = self.header_for(self.index)?;
        let payload = self.payload.get(start..end)?;
        self.index += 1;
        Some(FragmentFrame { header, payload })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Fragments<'_> {}

impl FusedIterator for Fragments<'_> {}
