//! Chunk decoding: raw agent frames → UTF-8 text fragments.
//!
//! One frame yields at most one fragment, produced as the frame arrives.
//! Frames without a payload are skipped; a payload that is not valid UTF-8
//! is logged and skipped without ending the stream. Transport errors are
//! passed through so the caller can report them.

use agentchat_core::error::ProviderError;
use agentchat_core::provider::FrameStream;
use futures::{Stream, StreamExt};
use tracing::warn;

/// Decode a frame stream lazily.
pub fn decode_frames(frames: FrameStream) -> impl Stream<Item = Result<String, ProviderError>> + Send {
    frames.filter_map(|frame| async move {
        match frame {
            Err(e) => Some(Err(e)),
            Ok(frame) => {
                let payload = frame.payload?;
                match String::from_utf8(payload) {
                    Ok(text) if text.is_empty() => None,
                    Ok(text) => Some(Ok(text)),
                    Err(e) => {
                        warn!(bytes = e.as_bytes().len(), error = %e.utf8_error(), "Skipping undecodable chunk");
                        None
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentchat_core::provider::EventFrame;

    fn stream_of(frames: Vec<Result<EventFrame, ProviderError>>) -> FrameStream {
        futures::stream::iter(frames).boxed()
    }

    #[tokio::test]
    async fn payload_frames_become_fragments() {
        let frames = stream_of(vec![
            Ok(EventFrame::with_payload(b"He".to_vec())),
            Ok(EventFrame::with_payload(b"llo".to_vec())),
            Ok(EventFrame::default()),
        ]);
        let out: Vec<_> = decode_frames(frames).collect().await;
        let texts: Vec<String> = out.into_iter().map(Result::unwrap).collect();
        assert_eq!(texts, vec!["He", "llo"]);
    }

    #[tokio::test]
    async fn invalid_utf8_is_skipped() {
        let frames = stream_of(vec![
            Ok(EventFrame::with_payload(vec![0xff, 0xfe])),
            Ok(EventFrame::with_payload("ok".as_bytes().to_vec())),
        ]);
        let out: Vec<_> = decode_frames(frames).collect().await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_deref().unwrap(), "ok");
    }

    #[tokio::test]
    async fn empty_source_yields_nothing() {
        let out: Vec<_> = decode_frames(stream_of(vec![])).collect().await;
        assert!(out.is_empty());

        let only_meta = stream_of(vec![Ok(EventFrame::default()), Ok(EventFrame::default())]);
        assert_eq!(decode_frames(only_meta).count().await, 0);
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let frames = stream_of(vec![
            Ok(EventFrame::with_payload(b"partial".to_vec())),
            Err(ProviderError::StreamInterrupted("reset".into())),
        ]);
        let out: Vec<_> = decode_frames(frames).collect().await;
        assert_eq!(out.len(), 2);
        assert!(out[1].is_err());
    }

    #[tokio::test]
    async fn decoding_is_incremental() {
        // A pending source must not prevent earlier fragments from coming out.
        let first = futures::stream::iter(vec![Ok(EventFrame::with_payload(b"a".to_vec()))]);
        let frames = first.chain(futures::stream::pending()).boxed();
        let mut decoded = Box::pin(decode_frames(frames));
        let got = tokio::time::timeout(std::time::Duration::from_secs(1), decoded.next())
            .await
            .unwrap();
        assert_eq!(got.unwrap().unwrap(), "a");
    }
}
