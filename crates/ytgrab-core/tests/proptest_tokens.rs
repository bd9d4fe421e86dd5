use proptest::prelude::*;
use ytgrab_core::callback::{Action, AudioQuality, Selection, VideoQuality};
use ytgrab_core::config::{CALLBACK_DATA_LIMIT, MAX_BATCH_COUNT};
use std::time::Duration;
use ytgrab_core::fingerprint::{Fingerprint, FingerprintCache, FINGERPRINT_LEN};
use ytgrab_core::link::classify;
use ytgrab_core::utils::truncate_with_ellipsis;

fn selection() -> impl Strategy<Value = Selection> {
    prop_oneof![
        proptest::sample::select(VideoQuality::ALL.to_vec()).prop_map(Selection::Video),
        proptest::sample::select(AudioQuality::ALL.to_vec()).prop_map(Selection::Audio),
    ]
}

fn action() -> impl Strategy<Value = Action> {
    let fp = "\\PC{1,200}".prop_map(|url| Fingerprint::of(&url));
    prop_oneof![
        (selection(), fp.clone()).prop_map(|(selection, fingerprint)| Action::Download {
            selection,
            fingerprint
        }),
        (selection(), 1..=MAX_BATCH_COUNT, fp.clone()).prop_map(
            |(selection, count, fingerprint)| Action::Batch {
                selection,
                count,
                fingerprint
            }
        ),
        fp.clone().prop_map(Action::List),
        fp.prop_map(Action::Open),
        Just(Action::Help),
        Just(Action::Settings),
    ]
}

proptest! {
    /// Every action survives encoding and fits the callback payload.
    #[test]
    fn encoded_actions_fit_and_decode(action in action()) {
        let token = action.encode();
        prop_assert!(token.len() <= CALLBACK_DATA_LIMIT, "{} is too long", token);
        prop_assert_eq!(Action::decode(&token), Ok(action));
    }

    /// Decoding arbitrary input never panics.
    #[test]
    fn decode_never_panics(token in "\\PC*") {
        let _ = Action::decode(&token);
    }

    /// Colon-heavy input exercises every field-count branch.
    #[test]
    fn decode_rejects_or_accepts_colon_soup(token in "[a-z0-9_:]{0,80}") {
        if let Ok(action) = Action::decode(&token) {
            prop_assert!(action.encode().len() <= CALLBACK_DATA_LIMIT);
        }
    }

    /// Fingerprints are deterministic lowercase hex of fixed length.
    #[test]
    fn fingerprint_shape(url in "\\PC*") {
        let fp = Fingerprint::of(&url);
        prop_assert_eq!(fp.as_str().len(), FINGERPRINT_LEN);
        prop_assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        prop_assert_eq!(fp, Fingerprint::of(&url));
    }

    /// Every registered URL resolves back to itself.
    #[test]
    fn registered_urls_resolve(urls in proptest::collection::vec("\\PC{0,300}", 1..20)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime");
        rt.block_on(async {
            let cache = FingerprintCache::new(1_000, Duration::from_secs(3600));
            let mut registered = Vec::with_capacity(urls.len());
            for url in &urls {
                registered.push((cache.register(url).await, url));
            }
            for (fingerprint, url) in registered {
                let resolved = cache.resolve(&fingerprint).await;
                prop_assert_eq!(resolved.as_deref(), Ok(url.as_str()));
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Link classification is total.
    #[test]
    fn classify_never_panics(text in "\\PC*") {
        let _ = classify(&text);
    }

    /// Truncation never exceeds the requested length.
    #[test]
    fn truncation_is_bounded(s in "\\PC{0,120}", max in 1usize..60) {
        use unicode_segmentation::UnicodeSegmentation;
        prop_assert!(truncate_with_ellipsis(&s, max).graphemes(true).count() <= max);
    }
}
