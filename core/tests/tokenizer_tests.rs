use search_core::tokenizer::{analyze, clean_text, strip_token};

#[test]
fn it_cleans_normalizes_and_stems() {
    let cleaned = clean_text("Running Runners RUN! The café's menu.");
    assert_eq!(cleaned, "running runners run the cafe s menu");
    let words = analyze(&cleaned);
    assert!(words.contains(&"run".to_string()));
    assert!(words.contains(&"cafe".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let words = analyze(&clean_text("The quick brown fox and the lazy dog"));
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"quick".to_string()));
}

#[test]
fn hyphens_survive_and_digits_do_not() {
    assert_eq!(clean_text("state-of-the-art 2024 release"), "state-of-the-art release");
    assert_eq!(strip_token("\"Page,\""), "page");
    assert_eq!(strip_token("42"), "");
}
