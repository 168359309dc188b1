use valley_cms::assets::{asset_url, AssetNaming};

const BASE: &str = "https://media.s3.us-east-1.amazonaws.com";

fn naming() -> AssetNaming {
    AssetNaming::new("Dashboard")
}

#[test]
fn resolves_plain_urls() {
    let n = naming();
    assert_eq!(n.resolve_key(&format!("{BASE}/Dashboard/1_ab_cover.png")).as_deref(), Some("Dashboard/1_ab_cover.png"));
    // legacy URLs without the prefix in the path
    assert_eq!(n.resolve_key(&format!("{BASE}/1_ab_cover.png")).as_deref(), Some("Dashboard/1_ab_cover.png"));
    // bare key
    assert_eq!(n.resolve_key("Dashboard/x.png").as_deref(), Some("Dashboard/x.png"));
}

#[test]
fn decodes_percent_encoded_segments() {
    let n = naming();
    assert_eq!(n.resolve_key(&format!("{BASE}/Dashboard/my%20photo%281%29.png")).as_deref(), Some("Dashboard/my photo(1).png"));
    // an encoded slash keeps the namespace intact
    assert_eq!(n.resolve_key(&format!("{BASE}/Dashboard%2Fa.png")).as_deref(), Some("Dashboard/a.png"));
}

#[test]
fn ignores_query_and_fragment() {
    let n = naming();
    assert_eq!(
        n.resolve_key(&format!("{BASE}/Dashboard/a.png?X-Amz-Signature=abc#top")).as_deref(),
        Some("Dashboard/a.png")
    );
}

#[test]
fn unresolvable_input_yields_none() {
    let n = naming();
    for bad in [
        "",
        "   ",
        "https://media.example.com",
        "https://media.example.com/",
        "https://media.example.com/Dashboard/",
        "://nothing/here.png",
        "https://media.example.com/Dashboard/%E0%A4%A",
        "https://media.example.com/..",
        "https://media.example.com/a%00b.png",
    ] {
        assert_eq!(n.resolve_key(bad), None, "{bad:?}");
    }
}

#[test]
fn minted_keys_survive_url_round_trip() {
    let n = naming();
    for name in ["cover.png", "my photo (final).jpg", "ünïcode-名前.webp", "50%off.gif", "a+b&c=d.png", "../../etc/passwd"] {
        let key = n.mint_key(name);
        assert!(key.starts_with("Dashboard/"), "{key}");
        assert_eq!(key.matches('/').count(), 1, "{key}");
        let url = asset_url(BASE, &key);
        assert_eq!(n.resolve_key(&url), Some(key.clone()), "{url}");
        // resolving the key itself is a fixed point
        assert_eq!(n.resolve_key(&key), Some(key));
    }
}

#[test]
fn minted_keys_are_unique() {
    let n = naming();
    let a = n.mint_key("same.png");
    let b = n.mint_key("same.png");
    assert_ne!(a, b);
}

#[test]
fn prefix_is_normalised() {
    let n = AssetNaming::new("/media/");
    assert_eq!(n.prefix(), "media");
    assert_eq!(n.resolve_key("https://x.test/a.png").as_deref(), Some("media/a.png"));
}
