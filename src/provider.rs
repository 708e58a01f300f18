//! The seam between a chat session and the model service.

use std::pin::Pin;

use futures::Stream;

use crate::Result;
use crate::types::{GenerateContentRequest, GenerateContentResponse, Model};

/// A stream of response chunks, in the order the provider emitted them.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<GenerateContentResponse>> + Send>>;

/// Something that can stream a model reply for a request.
///
/// [`Gemini`](crate::Gemini) is the production implementation.  An error returned from
/// `stream_generate_content` means the request never started streaming; errors yielded by
/// the returned stream mean it broke partway.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Start streaming a reply for `request` from `model`.
    async fn stream_generate_content(
        &self,
        model: &Model,
        request: GenerateContentRequest,
    ) -> Result<ChunkStream>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use futures::stream;

    use super::*;
    use crate::Error;
    use crate::types::{Candidate, Content};

    /// One scripted reply: either the request fails outright or the listed chunks stream.
    pub enum Script {
        Refuse(Error),
        Chunks(Vec<Result<GenerateContentResponse>>),
    }

    /// Plays back scripted replies in order and records every request it sees.
    #[derive(Default)]
    pub struct ScriptedProvider {
        scripts: Mutex<VecDeque<Script>>,
        requests: Mutex<Vec<(Model, GenerateContentRequest)>>,
    }

    impl ScriptedProvider {
        pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// A provider that streams each reply as the given text fragments.
        pub fn replying(replies: &[&[&str]]) -> Self {
            Self::new(replies.iter().map(|fragments| {
                Script::Chunks(fragments.iter().map(|text| Ok(text_chunk(text))).collect())
            }))
        }

        pub fn requests(&self) -> Vec<(Model, GenerateContentRequest)> {
            self.requests.lock().unwrap().clone()
        }
    }

    pub fn text_chunk(text: &str) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content::model(text)),
                ..Candidate::default()
            }],
            ..GenerateContentResponse::default()
        }
    }

    #[async_trait::async_trait]
    impl Provider for ScriptedProvider {
        async fn stream_generate_content(
            &self,
            model: &Model,
            request: GenerateContentRequest,
        ) -> Result<ChunkStream> {
            self.requests
                .lock()
                .unwrap()
                .push((model.clone(), request));
            match self.scripts.lock().unwrap().pop_front() {
                Some(Script::Refuse(err)) => Err(err),
                Some(Script::Chunks(chunks)) => Ok(Box::pin(stream::iter(chunks))),
                None => Err(Error::connection("no scripted reply left", None)),
            }
        }
    }
}
