use thiserror::Error;

/// A single acquisition job: find and process new videos for one hashtag.
///
/// Validated at construction; the engine never re-checks the fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    hashtag: String,
    target_new_count: usize,
}

/// Rejected user input for a job request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    /// The hashtag was empty after trimming.
    #[error("hashtag must not be empty")]
    EmptyHashtag,
    /// The tag page URL takes the bare word; a `#` anywhere is a typo.
    #[error("enter the hashtag without the '#' symbol")]
    HashtagContainsHash,
    /// At least one video must be requested.
    #[error("number of videos must be positive")]
    ZeroCount,
}

impl JobRequest {
    /// Validates user input and builds a request. The hashtag is trimmed;
    /// a `#` is rejected rather than stripped.
    pub fn new(hashtag: &str, target_new_count: usize) -> Result<Self, RequestError> {
        let hashtag = hashtag.trim();
        if hashtag.is_empty() {
            return Err(RequestError::EmptyHashtag);
        }
        if hashtag.contains('#') {
            return Err(RequestError::HashtagContainsHash);
        }
        if target_new_count == 0 {
            return Err(RequestError::ZeroCount);
        }
        Ok(Self {
            hashtag: hashtag.to_owned(),
            target_new_count,
        })
    }

    /// The bare tag word, without any `#` prefix.
    pub fn hashtag(&self) -> &str {
        &self.hashtag
    }

    /// How many previously unseen videos this job should process.
    pub fn target_new_count(&self) -> usize {
        self.target_new_count
    }
}
