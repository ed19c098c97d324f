use tagreel_core::{JobRequest, RequestError};

#[test]
fn accepts_plain_hashtag_and_trims_whitespace() {
    let req = JobRequest::new("  funnycats  ", 5).unwrap();
    assert_eq!(req.hashtag(), "funnycats");
    assert_eq!(req.target_new_count(), 5);
}

#[test]
fn rejects_empty_and_whitespace_hashtags() {
    assert_eq!(JobRequest::new("", 3), Err(RequestError::EmptyHashtag));
    assert_eq!(JobRequest::new("   ", 3), Err(RequestError::EmptyHashtag));
}

#[test]
fn rejects_hash_symbol_anywhere_in_the_tag() {
    assert_eq!(
        JobRequest::new("#funnycats", 3),
        Err(RequestError::HashtagContainsHash)
    );
    assert_eq!(
        JobRequest::new("funny#cats", 3),
        Err(RequestError::HashtagContainsHash)
    );
}

#[test]
fn rejects_zero_count() {
    assert_eq!(JobRequest::new("funnycats", 0), Err(RequestError::ZeroCount));
}
