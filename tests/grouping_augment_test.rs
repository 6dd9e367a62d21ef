mod common;

use common::MapProvider;
use yangfold::{Context, Format, NodeKind, YangError};

const MODULE_C: &str = "module C { namespace 'urn:c'; prefix c;
  grouping g { leaf l { type string; } }
  container c { uses g; }
}";

#[test]
fn test_uses_instantiates_copies() {
    let mut ctx = Context::default();
    let mid = ctx.parse_module(MODULE_C, Format::Yang).unwrap();
    let c = ctx.find_node(mid, "/c").unwrap();

    let kids = ctx.data_children(mid, Some(c));
    assert_eq!(kids.len(), 1);
    let copy = kids[0];
    assert_eq!(ctx.node(copy).name.as_str(), "l");
    // the copy belongs to the using module
    assert_eq!(ctx.node(copy).module, mid);

    // the grouping keeps its own body
    let module = ctx.module(mid);
    let mut found_grouping_child = false;
    let mut cur = module.data;
    while let Some(id) = cur {
        if matches!(ctx.node(id).kind, NodeKind::Grouping(_)) {
            let original = ctx.node(id).child.unwrap();
            assert_eq!(ctx.node(original).name.as_str(), "l");
            assert_ne!(original, copy);
            found_grouping_child = true;
        }
        cur = ctx.node(id).next;
    }
    assert!(found_grouping_child);
}

#[test]
fn test_uses_inherits_config() {
    let mut ctx = Context::default();
    let mid = ctx
        .parse_module(
            "module u { namespace 'urn:u'; prefix u;
               grouping g { leaf l { type string; } }
               container state { config false; uses g; }
             }",
            Format::Yang,
        )
        .unwrap();
    let l = ctx.find_node(mid, "/state/l").unwrap();
    assert!(!ctx.node(l).config);
}

#[test]
fn test_refine_edits_copy() {
    let mut ctx = Context::default();
    let mid = ctx
        .parse_module(
            "module r { namespace 'urn:r'; prefix r;
               grouping g {
                 container box { presence 'there'; }
                 leaf l { type string; }
               }
               container c {
                 uses g {
                   refine 'l' { default 'fallback'; description 'refined'; }
                   refine 'box' { presence 'replaced'; }
                 }
               }
             }",
            Format::Yang,
        )
        .unwrap();
    let l = ctx.find_node(mid, "/c/l").unwrap();
    match &ctx.node(l).kind {
        NodeKind::Leaf(b) => assert_eq!(b.default.as_deref(), Some("fallback")),
        _ => panic!("expected leaf"),
    }
    assert_eq!(ctx.node(l).dsc.as_deref(), Some("refined"));
    let b = ctx.find_node(mid, "/c/box").unwrap();
    match &ctx.node(b).kind {
        NodeKind::Container(body) => assert_eq!(body.presence.as_deref(), Some("replaced")),
        _ => panic!("expected container"),
    }
}

#[test]
fn test_uses_level_augment() {
    let mut ctx = Context::default();
    let mid = ctx
        .parse_module(
            "module ua { namespace 'urn:ua'; prefix ua;
               grouping g { container inner { } }
               container c {
                 uses g {
                   augment 'inner' { leaf extra { type int8; } }
                 }
               }
             }",
            Format::Yang,
        )
        .unwrap();
    let extra = ctx.find_node(mid, "/c/inner/extra").unwrap();
    assert_eq!(ctx.node(extra).name.as_str(), "extra");
}

#[test]
fn test_cross_module_augment_and_teardown() {
    let mut ctx = Context::default();
    let cmid = ctx.parse_module(MODULE_C, Format::Yang).unwrap();
    let dmid = ctx
        .parse_module(
            "module D { namespace 'urn:d'; prefix d;
               import C { prefix c; }
               augment '/c:c' { leaf extra { type int32; } }
             }",
            Format::Yang,
        )
        .unwrap();

    let c = ctx.find_node(cmid, "/c").unwrap();
    let names: Vec<String> = ctx
        .data_children(cmid, Some(c))
        .into_iter()
        .map(|id| ctx.node(id).name.to_string())
        .collect();
    assert_eq!(names, vec!["l", "extra"]);
    let extra = ctx.find_node(cmid, "/c/extra").unwrap();
    assert_eq!(ctx.node(extra).module, dmid);

    ctx.destroy_module(dmid).unwrap();
    let names: Vec<String> = ctx
        .data_children(cmid, Some(c))
        .into_iter()
        .map(|id| ctx.node(id).name.to_string())
        .collect();
    assert_eq!(names, vec!["l"]);
}

#[test]
fn test_augment_name_clash_rules() {
    let mut ctx = Context::default();
    ctx.parse_module(MODULE_C, Format::Yang).unwrap();
    // a foreign module may add a same-named child, it lives in another
    // namespace
    ctx.parse_module(
        "module E { namespace 'urn:e'; prefix e;
           import C { prefix c; }
           augment '/c:c' { leaf l { type int32; } }
         }",
        Format::Yang,
    )
    .unwrap();
    // within one module the name must stay unique
    let err = ctx
        .parse_module(
            "module F { namespace 'urn:f'; prefix f;
               container c { leaf l { type string; } }
               augment '/c' { leaf l { type int32; } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::DuplicateIdentifier(_)));
}

#[test]
fn test_import_via_provider() {
    let mut ctx = Context::default();
    ctx.set_provider(Box::new(MapProvider::new(&[(
        "types",
        "module types { namespace 'urn:types'; prefix t;
           typedef port { type uint16 { range '1..65535'; } }
         }",
    )])));
    let mid = ctx
        .parse_module(
            "module app { namespace 'urn:app'; prefix app;
               import types { prefix t; }
               leaf listen { type t:port; default '8080'; }
             }",
            Format::Yang,
        )
        .unwrap();
    assert!(ctx.get_module("types", None).is_some());
    let leaf = ctx.find_node(mid, "/listen").unwrap();
    assert_eq!(
        ctx.node(leaf).leaf_type().unwrap().base,
        yangfold::schema::TypeBase::Uint16
    );
}

#[test]
fn test_unknown_prefix_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module p { namespace 'urn:p'; prefix p;
               leaf l { type ghost:t; }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::UnknownPrefix(_)));
}
