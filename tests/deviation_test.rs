use yangfold::{Context, Format, NodeKind, YangError};

const MODULE_C: &str = "module C { namespace 'urn:c'; prefix c;
  container c {
    leaf l { type string; }
    leaf-list tags { type string; }
    list entries { key 'name'; leaf name { type string; } leaf note { type string; } }
  }
}";

#[test]
fn test_not_supported_toggles() {
    let mut ctx = Context::default();
    let cmid = ctx.parse_module(MODULE_C, Format::Yang).unwrap();
    let emid = ctx
        .parse_module(
            "module E { namespace 'urn:e'; prefix e;
               import C { prefix c; }
               deviation '/c:c/c:l' { deviate not-supported; }
             }",
            Format::Yang,
        )
        .unwrap();

    assert!(ctx.find_node(cmid, "/c/l").is_none());
    assert!(ctx.module(cmid).deviated);
    assert!(ctx.module(emid).implemented);

    ctx.switch_deviations(emid).unwrap();
    assert!(ctx.find_node(cmid, "/c/l").is_some());
    assert!(!ctx.module(cmid).deviated);

    ctx.switch_deviations(emid).unwrap();
    assert!(ctx.find_node(cmid, "/c/l").is_none());
    assert!(ctx.module(cmid).deviated);
}

#[test]
fn test_not_supported_on_key_fails() {
    let mut ctx = Context::default();
    ctx.parse_module(MODULE_C, Format::Yang).unwrap();
    let err = ctx
        .parse_module(
            "module K { namespace 'urn:k'; prefix k;
               import C { prefix c; }
               deviation '/c:c/c:entries/c:name' { deviate not-supported; }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::NotSupportedRemovesKey(_)));
}

#[test]
fn test_deviation_of_own_module_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module S { namespace 'urn:s'; prefix s;
               leaf l { type string; }
               deviation '/l' { deviate not-supported; }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::DeviationOfOwnModule(_)));
}

#[test]
fn test_deviate_add_and_delete_units() {
    let mut ctx = Context::default();
    let cmid = ctx.parse_module(MODULE_C, Format::Yang).unwrap();
    let dmid = ctx
        .parse_module(
            "module U { namespace 'urn:u'; prefix u;
               import C { prefix c; }
               deviation '/c:c/c:l' { deviate add { units 'meters'; } }
             }",
            Format::Yang,
        )
        .unwrap();
    let l = ctx.find_node(cmid, "/c/l").unwrap();
    match &ctx.node(l).kind {
        NodeKind::Leaf(b) => assert_eq!(b.units.as_deref(), Some("meters")),
        _ => panic!("expected leaf"),
    }

    // toggling restores the written shape
    ctx.switch_deviations(dmid).unwrap();
    match &ctx.node(l).kind {
        NodeKind::Leaf(b) => assert_eq!(b.units, None),
        _ => panic!("expected leaf"),
    }
    ctx.switch_deviations(dmid).unwrap();
    match &ctx.node(l).kind {
        NodeKind::Leaf(b) => assert_eq!(b.units.as_deref(), Some("meters")),
        _ => panic!("expected leaf"),
    }
}

#[test]
fn test_deviate_add_requires_absence() {
    let mut ctx = Context::default();
    ctx.parse_module(
        "module W { namespace 'urn:w'; prefix w;
           leaf l { type string; units 'volts'; }
         }",
        Format::Yang,
    )
    .unwrap();
    let err = ctx
        .parse_module(
            "module X { namespace 'urn:x'; prefix x;
               import W { prefix w; }
               deviation '/w:l' { deviate add { units 'amps'; } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));
}

#[test]
fn test_deviate_replace_type_and_max() {
    let mut ctx = Context::default();
    let cmid = ctx.parse_module(MODULE_C, Format::Yang).unwrap();
    ctx.parse_module(
        "module R { namespace 'urn:r'; prefix r;
           import C { prefix c; }
           deviation '/c:c/c:l' { deviate replace { type uint8; } }
           deviation '/c:c/c:tags' { deviate add { max-elements 4; } }
         }",
        Format::Yang,
    )
    .unwrap();
    let l = ctx.find_node(cmid, "/c/l").unwrap();
    assert_eq!(
        ctx.node(l).leaf_type().unwrap().base,
        yangfold::schema::TypeBase::Uint8
    );
    let tags = ctx.find_node(cmid, "/c/tags").unwrap();
    match &ctx.node(tags).kind {
        NodeKind::LeafList(b) => assert_eq!(b.max, 4),
        _ => panic!("expected leaf-list"),
    }
}

#[test]
fn test_deviate_delete_requires_match() {
    let mut ctx = Context::default();
    ctx.parse_module(
        "module W { namespace 'urn:w'; prefix w;
           leaf l { type string; units 'volts'; }
         }",
        Format::Yang,
    )
    .unwrap();
    let err = ctx
        .parse_module(
            "module Y { namespace 'urn:y'; prefix y;
               import W { prefix w; }
               deviation '/w:l' { deviate delete { units 'amps'; } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));
}

#[test]
fn test_not_supported_cannot_combine() {
    let mut ctx = Context::default();
    ctx.parse_module(MODULE_C, Format::Yang).unwrap();
    let err = ctx
        .parse_module(
            "module Z { namespace 'urn:z'; prefix z;
               import C { prefix c; }
               deviation '/c:c/c:l' {
                 deviate not-supported;
                 deviate add { units 'm'; }
               }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::UnexpectedStatementInContext(_)));
}

#[test]
fn test_deviating_module_recorded_in_target_imports() {
    let mut ctx = Context::default();
    let cmid = ctx.parse_module(MODULE_C, Format::Yang).unwrap();
    ctx.parse_module(
        "module V { namespace 'urn:v'; prefix v;
           import C { prefix c; }
           deviation '/c:c/c:l' { deviate add { units 'm'; } }
         }",
        Format::Yang,
    )
    .unwrap();
    let has_external = ctx
        .module(cmid)
        .imports
        .iter()
        .any(|i| i.external == yangfold::schema::ExternalKind::ViaDeviation);
    assert!(has_external);
}
