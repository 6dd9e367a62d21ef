use yangfold::{Context, Format};

const MODULE_B: &str = "module B { namespace 'urn:b'; prefix b;
  feature x;
  feature y { if-feature x; }
  container c { if-feature y; leaf l { type string; } }
}";

#[test]
fn test_enable_pulls_in_dependencies() {
    let mut ctx = Context::default();
    let mid = ctx.parse_module(MODULE_B, Format::Yang).unwrap();
    assert_eq!(ctx.features_state(mid, "x"), Some(false));
    assert_eq!(ctx.features_state(mid, "y"), Some(false));

    ctx.features_enable(mid, "y").unwrap();
    assert_eq!(ctx.features_state(mid, "x"), Some(true));
    assert_eq!(ctx.features_state(mid, "y"), Some(true));
}

#[test]
fn test_disable_is_not_recursive() {
    let mut ctx = Context::default();
    let mid = ctx.parse_module(MODULE_B, Format::Yang).unwrap();
    ctx.features_enable(mid, "y").unwrap();
    ctx.features_disable(mid, "y").unwrap();
    assert_eq!(ctx.features_state(mid, "x"), Some(true));
    assert_eq!(ctx.features_state(mid, "y"), Some(false));
}

#[test]
fn test_wildcard_enables_all() {
    let mut ctx = Context::default();
    let mid = ctx.parse_module(MODULE_B, Format::Yang).unwrap();
    ctx.features_enable(mid, "*").unwrap();
    assert!(ctx.features_list(mid).iter().all(|(_, on)| *on));
}

#[test]
fn test_unknown_feature_reported() {
    let mut ctx = Context::default();
    let mid = ctx.parse_module(MODULE_B, Format::Yang).unwrap();
    assert!(ctx.features_enable(mid, "nope").is_err());
    assert_eq!(ctx.features_state(mid, "nope"), None);
}

#[test]
fn test_if_feature_disables_subtree() {
    let mut ctx = Context::default();
    let mid = ctx.parse_module(MODULE_B, Format::Yang).unwrap();
    let c = ctx.find_node(mid, "/c").unwrap();
    let l = ctx.find_node(mid, "/c/l").unwrap();

    // y is off, so the container and everything below it is disabled
    assert!(ctx.is_disabled(c));
    assert!(ctx.is_disabled(l));

    ctx.features_enable(mid, "y").unwrap();
    assert!(!ctx.is_disabled(c));
    assert!(!ctx.is_disabled(l));
}

#[test]
fn test_unknown_if_feature_fails_load() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module f { namespace 'urn:f'; prefix f; leaf l { type string; if-feature ghost; } }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, yangfold::YangError::UnresolvedReference(_)));
}
