mod common;

use common::MapProvider;
use yangfold::{Context, Format, YangError};

const OWNER: &str = "module host { namespace 'urn:host'; prefix h;
  include host-system;
  leaf hostname { type string; }
}";

const SUBMODULE: &str = "submodule host-system { belongs-to host { prefix h; }
  leaf uptime { type uint64; }
}";

#[test]
fn test_include_contributes_to_owner_chain() {
    let mut ctx = Context::default();
    ctx.set_provider(Box::new(MapProvider::new(&[("host-system", SUBMODULE)])));
    let mid = ctx.parse_module(OWNER, Format::Yang).unwrap();

    // both leaves sit in the owner's single data chain
    let names: Vec<String> = ctx
        .data_children(mid, None)
        .into_iter()
        .map(|id| ctx.node(id).name.to_string())
        .collect();
    assert_eq!(names, vec!["hostname", "uptime"]);

    // the submodule node still identifies its submodule as owner
    let uptime = ctx.find_node(mid, "/uptime").unwrap();
    let sub_mid = ctx.node(uptime).module;
    assert_ne!(sub_mid, mid);
    assert!(ctx.module(sub_mid).is_submodule());
    assert_eq!(ctx.module(sub_mid).name.as_str(), "host-system");
}

#[test]
fn test_destroy_owner_frees_submodule_nodes() {
    let mut ctx = Context::default();
    ctx.set_provider(Box::new(MapProvider::new(&[("host-system", SUBMODULE)])));
    let mid = ctx.parse_module(OWNER, Format::Yang).unwrap();
    ctx.destroy_module(mid).unwrap();
    assert_eq!(ctx.dict().len(), 0);
    assert!(ctx.get_module("host", None).is_none());
    assert!(ctx.module_ids().is_empty());
}

#[test]
fn test_submodule_as_module_rejected() {
    let mut ctx = Context::default();
    let err = ctx.parse_module(SUBMODULE, Format::Yang).unwrap_err();
    assert!(matches!(err, YangError::UnexpectedStatementInContext(_)));
}

#[test]
fn test_belongs_to_mismatch_fails() {
    let mut ctx = Context::default();
    ctx.set_provider(Box::new(MapProvider::new(&[(
        "wrong-sub",
        "submodule wrong-sub { belongs-to other { prefix o; } }",
    )])));
    let err = ctx
        .parse_module(
            "module host { namespace 'urn:host'; prefix h; include wrong-sub; }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));
}

#[test]
fn test_missing_submodule_fails() {
    let mut ctx = Context::default();
    let err = ctx.parse_module(OWNER, Format::Yang).unwrap_err();
    assert!(matches!(err, YangError::UnresolvedReference(_)));
}

#[test]
fn test_submodule_feature_visible_through_owner() {
    let mut ctx = Context::default();
    ctx.set_provider(Box::new(MapProvider::new(&[(
        "feat-sub",
        "submodule feat-sub { belongs-to host { prefix h; }
           feature turbo;
           leaf speed { type uint32; if-feature turbo; }
         }",
    )])));
    let mid = ctx
        .parse_module(
            "module host { namespace 'urn:host'; prefix h; include feat-sub; }",
            Format::Yang,
        )
        .unwrap();
    assert_eq!(ctx.features_state(mid, "turbo"), Some(false));
    ctx.features_enable(mid, "turbo").unwrap();
    assert_eq!(ctx.features_state(mid, "turbo"), Some(true));
}
