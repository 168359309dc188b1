use serde_json::json;
use valley_cms::assets::AssetMatcher;
use valley_cms::content::{
    bind_images, bind_thumbnail, content_tree, parse_content, unresolved_placeholders, ContentBlock, MediaSlot,
    UploadField, Uploads,
};
use valley_cms::error::LifecycleError;

const BASE: &str = "https://media.s3.us-east-1.amazonaws.com";

fn matcher() -> AssetMatcher {
    AssetMatcher::new([BASE])
}

fn uploads(n: usize) -> Uploads {
    let mut up = Uploads::default();
    for i in 0..n {
        let key = format!("Dashboard/{i}_img.png");
        up.push(UploadField::Images, key.clone(), format!("{BASE}/{key}"));
    }
    up
}

#[test]
fn walker_finds_assets_at_any_depth() {
    let a = format!("{BASE}/Dashboard/a.png");
    let b = format!("{BASE}/Dashboard/b.png");
    let c = format!("{BASE}/Dashboard/c.png");
    let tree = json!([
        {"type": "text", "value": "plain"},
        {"type": "gallery", "items": [
            {"caption": "x", "media": {"src": a, "alts": [[{"deep": {"deeper": [b]}}]]}},
            42, null, true
        ]},
        {"meta": {"og": {"image": {"sizes": {"large": c}}}}},
        {"type": "link", "value": "https://example.com/page"}
    ]);
    let found = matcher().extract_asset_refs(&tree);
    assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![a, b, c]);
}

#[test]
fn walker_dedups_repeated_urls() {
    let a = format!("{BASE}/Dashboard/a.png");
    let tree = json!({"one": [a], "two": {"again": a}, "three": [[a]]});
    assert_eq!(matcher().extract_asset_refs(&tree).len(), 1);
}

#[test]
fn walker_on_empty_input_is_empty() {
    assert!(matcher().extract_asset_refs(&json!(null)).is_empty());
    assert!(matcher().extract_asset_refs(&json!([])).is_empty());
    assert!(matcher().extract_asset_refs(&json!({})).is_empty());
    assert!(AssetMatcher::new(Vec::<String>::new()).extract_asset_refs(&json!([BASE])).is_empty());
}

#[test]
fn parse_rejects_non_arrays_and_bad_json() {
    for raw in ["", "{", r#"{"type":"text","value":"x"}"#, "\"[]\"", "7"] {
        assert!(matches!(parse_content(raw), Err(LifecycleError::MalformedContent(_))), "{raw:?}");
    }
    assert!(parse_content("[]").unwrap().is_empty());
}

#[test]
fn unknown_blocks_survive_a_round_trip() {
    let raw = json!([
        {"type": "quote", "value": "q", "by": "someone"},
        {"type": "text", "value": "t", "style": "bold"},
        {"type": "text", "value": 5},
        "bare string"
    ]);
    let blocks = parse_content(&raw.to_string()).unwrap();
    assert!(matches!(blocks[0], ContentBlock::Other(_)));
    assert!(matches!(blocks[1], ContentBlock::Text { .. }));
    assert!(matches!(blocks[2], ContentBlock::Other(_)));
    assert_eq!(content_tree(&blocks), raw);
}

#[test]
fn placeholders_bind_by_declared_index() {
    let blocks = parse_content(r#"[{"type":"image","value":1},{"type":"text","value":"hi"},{"type":"image","value":0}]"#)
        .unwrap();
    let up = uploads(2);
    let bound = bind_images(blocks, &up.images);
    assert_eq!(bound[0].image_url(), Some(up.images[1].storage_url.as_str()));
    assert_eq!(bound[1], ContentBlock::text("hi"));
    assert_eq!(bound[2].image_url(), Some(up.images[0].storage_url.as_str()));
    assert!(unresolved_placeholders(&bound).is_empty());
}

#[test]
fn out_of_range_placeholder_is_left_alone() {
    let blocks = parse_content(r#"[{"type":"image","value":0},{"type":"image","value":5}]"#).unwrap();
    let up = uploads(1);
    let bound = bind_images(blocks, &up.images);
    assert!(bound[0].image_url().is_some());
    assert_eq!(bound[1], ContentBlock::image(MediaSlot::Placeholder(5)));
    assert_eq!(unresolved_placeholders(&bound), vec![5]);

    let none = bind_images(parse_content(r#"[{"type":"image","value":0}]"#).unwrap(), &[]);
    assert_eq!(none[0], ContentBlock::image(MediaSlot::Placeholder(0)));
}

#[test]
fn repeated_index_shares_one_upload() {
    let blocks = parse_content(r#"[{"type":"image","value":0},{"type":"image","value":0}]"#).unwrap();
    let up = uploads(1);
    let bound = bind_images(blocks, &up.images);
    assert_eq!(bound[0].image_url(), bound[1].image_url());
}

#[test]
fn string_values_are_urls_not_placeholders() {
    let blocks = parse_content(r#"[{"type":"image","value":"0"}]"#).unwrap();
    let bound = bind_images(blocks, &uploads(1).images);
    assert_eq!(bound[0], ContentBlock::image(MediaSlot::Url("0".into())));
}

#[test]
fn image_block_extras_are_preserved() {
    let blocks = parse_content(r#"[{"type":"image","value":0,"caption":"cover","width":640}]"#).unwrap();
    let bound = bind_images(blocks, &uploads(1).images);
    let tree = content_tree(&bound);
    assert_eq!(tree[0]["caption"], "cover");
    assert_eq!(tree[0]["width"], 640);
    assert_eq!(tree[0]["type"], "image");
}

#[test]
fn thumbnail_upload_replaces_current_value() {
    let mut up = Uploads::default();
    up.push(UploadField::Thumbnail, "Dashboard/t.png".into(), format!("{BASE}/Dashboard/t.png"));
    assert_eq!(
        bind_thumbnail(Some("old".into()), up.thumbnail.as_ref()).as_deref(),
        Some(format!("{BASE}/Dashboard/t.png").as_str())
    );
    assert_eq!(bind_thumbnail(Some("old".into()), None).as_deref(), Some("old"));
    assert_eq!(bind_thumbnail(None, None), None);
}

#[test]
fn bound_content_yields_its_assets() {
    let blocks = parse_content(r#"[{"type":"image","value":0},{"type":"image","value":1}]"#).unwrap();
    let up = uploads(2);
    let refs = matcher().extract_asset_refs(&content_tree(&bind_images(blocks, &up.images)));
    assert_eq!(refs.len(), 2);
    assert!(up.images.iter().all(|f| refs.contains(&f.storage_url)));
}
