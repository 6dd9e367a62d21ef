use yangfold::{Context, Format, NodeKind, YangError};

fn load(ctx: &mut Context, text: &str) -> yangfold::ModuleId {
    ctx.parse_module(text, Format::Yang).expect("module should load")
}

#[test]
fn test_two_revisions_newest_wins() {
    let mut ctx = Context::default();
    load(
        &mut ctx,
        "module A { namespace 'urn:a'; prefix a; revision 2020-01-01; }",
    );
    let newer = load(
        &mut ctx,
        "module A { namespace 'urn:a'; prefix a; revision 2021-02-02; }",
    );
    let found = ctx.get_module("A", None).unwrap();
    assert_eq!(found, newer);
    assert_eq!(ctx.module(found).revision().unwrap().as_str(), "2021-02-02");
}

#[test]
fn test_implemented_revision_preferred() {
    let mut ctx = Context::default();
    let old = load(
        &mut ctx,
        "module A { namespace 'urn:a'; prefix a; revision 2020-01-01; }",
    );
    load(
        &mut ctx,
        "module A { namespace 'urn:a'; prefix a; revision 2021-02-02; }",
    );
    ctx.set_implemented(old).unwrap();
    assert_eq!(ctx.get_module("A", None), Some(old));
}

#[test]
fn test_conflicting_implemented_revision() {
    let mut ctx = Context::default();
    let old = load(
        &mut ctx,
        "module A { namespace 'urn:a'; prefix a; revision 2020-01-01; }",
    );
    let new = load(
        &mut ctx,
        "module A { namespace 'urn:a'; prefix a; revision 2021-02-02; }",
    );
    ctx.set_implemented(old).unwrap();
    let err = ctx.set_implemented(new).unwrap_err();
    assert!(matches!(err, YangError::ConflictingImplementedRevision(_)));
}

#[test]
fn test_same_revision_returns_existing() {
    let mut ctx = Context::default();
    let first = load(
        &mut ctx,
        "module A { namespace 'urn:a'; prefix a; revision 2020-01-01; }",
    );
    let second = load(
        &mut ctx,
        "module A { namespace 'urn:a'; prefix a; revision 2020-01-01; }",
    );
    assert_eq!(first, second);
}

#[test]
fn test_missing_namespace_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module("module m { prefix m; }", Format::Yang)
        .unwrap_err();
    assert!(matches!(err, YangError::MissingRequiredChild(_)));
}

#[test]
fn test_duplicate_statement_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module m { namespace 'urn:m'; namespace 'urn:m2'; prefix m; }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::DuplicateStatement(_)));
}

#[test]
fn test_duplicate_sibling_identifier_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module m { namespace 'urn:m'; prefix m;
               leaf x { type string; }
               container x { }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::DuplicateIdentifier(_)));
}

#[test]
fn test_choice_case_names_share_sibling_namespace() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module m { namespace 'urn:m'; prefix m;
               choice c { case a { leaf x { type string; } } }
               leaf x { type string; }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::DuplicateIdentifier(_)));
}

#[test]
fn test_typedef_shadowing_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module m { namespace 'urn:m'; prefix m;
               typedef t { type string; }
               container c { typedef t { type int32; } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::DuplicateIdentifier(_)));

    let err = ctx
        .parse_module(
            "module m2 { namespace 'urn:m2'; prefix m2; typedef string { type int32; } }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::DuplicateIdentifier(_)));
}

#[test]
fn test_failed_load_leaves_repository_unchanged() {
    let mut ctx = Context::default();
    load(&mut ctx, "module ok { namespace 'urn:ok'; prefix ok; }");
    let before = ctx.module_ids().len();
    let dict_before = ctx.dict().len();

    let err = ctx.parse_module(
        "module bad { namespace 'urn:bad'; prefix bad;
           leaf l { type undefined-type; }
         }",
        Format::Yang,
    );
    assert!(err.is_err());
    assert_eq!(ctx.module_ids().len(), before);
    assert_eq!(ctx.dict().len(), dict_before);
}

#[test]
fn test_dict_accounting_after_destroy() {
    let mut ctx = Context::default();
    assert_eq!(ctx.dict().len(), 0);
    let mid = load(
        &mut ctx,
        "module acc { namespace 'urn:acc'; prefix acc;
           typedef name-type { type string { length '1..64'; } }
           container box { leaf name { type name-type; default 'x'; } }
         }",
    );
    assert!(ctx.dict().len() > 0);
    ctx.destroy_module(mid).unwrap();
    assert_eq!(ctx.dict().len(), 0);
    assert!(ctx.get_module("acc", None).is_none());
}

#[test]
fn test_enum_auto_values_and_duplicates() {
    let mut ctx = Context::default();
    let mid = load(
        &mut ctx,
        "module e { namespace 'urn:e'; prefix e;
           leaf l { type enumeration { enum zero; enum five { value 5; } enum six; } }
         }",
    );
    let leaf = ctx.find_node(mid, "/l").unwrap();
    match &ctx.node(leaf).kind {
        NodeKind::Leaf(b) => match &b.typ.info {
            yangfold::schema::TypeInfo::Enumeration { enums } => {
                assert_eq!(enums[0].value, 0);
                assert!(enums[0].auto);
                assert_eq!(enums[1].value, 5);
                assert!(!enums[1].auto);
                assert_eq!(enums[2].value, 6);
            }
            other => panic!("expected enumeration, got {other:?}"),
        },
        _ => panic!("expected leaf"),
    }

    let err = ctx
        .parse_module(
            "module e2 { namespace 'urn:e2'; prefix e2;
               leaf l { type enumeration { enum a { value 1; } enum b { value 1; } } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));
}

#[test]
fn test_enum_auto_value_overflow() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module e { namespace 'urn:e'; prefix e;
               leaf l { type enumeration { enum top { value 2147483647; } enum over; } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::EnumValueOverflow(_)));
}

#[test]
fn test_bits_sorted_by_position() {
    let mut ctx = Context::default();
    let mid = load(
        &mut ctx,
        "module b { namespace 'urn:b'; prefix b;
           leaf flags { type bits { bit high { position 8; } bit low { position 1; } bit follow; } }
         }",
    );
    let leaf = ctx.find_node(mid, "/flags").unwrap();
    match &ctx.node(leaf).kind {
        NodeKind::Leaf(b) => match &b.typ.info {
            yangfold::schema::TypeInfo::Bits { bits } => {
                // follow is auto-assigned one past the previous bit (1)
                let positions: Vec<u32> = bits.iter().map(|b| b.pos).collect();
                assert_eq!(positions, vec![1, 2, 8]);
                assert!(positions.windows(2).all(|w| w[0] < w[1]));
            }
            other => panic!("expected bits, got {other:?}"),
        },
        _ => panic!("expected leaf"),
    }
}

#[test]
fn test_fraction_digits_bounds() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module d { namespace 'urn:d'; prefix d;
               leaf l { type decimal64 { fraction-digits 19; } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));

    let err = ctx
        .parse_module(
            "module d { namespace 'urn:d'; prefix d;
               leaf l { type decimal64; }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::MissingRequiredChild(_)));
}

#[test]
fn test_invalid_range_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module r { namespace 'urn:r'; prefix r;
               leaf l { type uint8 { range '10..600'; } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::InvalidRange(_)));
}

#[test]
fn test_mandatory_with_default_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module m { namespace 'urn:m'; prefix m;
               leaf l { type string; mandatory true; default 'x'; }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::MandatoryWithDefault(_)));
}

#[test]
fn test_config_true_under_config_false_fails() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module m { namespace 'urn:m'; prefix m;
               container state { config false;
                 leaf counter { type uint32; config true; }
               }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));
}

#[test]
fn test_default_value_checked_against_type() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module m { namespace 'urn:m'; prefix m;
               leaf l { type uint8 { range '1..10'; } default '42'; }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));
}

#[test]
fn test_typedef_chain_resolution() {
    let mut ctx = Context::default();
    let mid = load(
        &mut ctx,
        "module t { namespace 'urn:t'; prefix t;
           typedef base-count { type uint16 { range '0..1000'; } }
           typedef small-count { type base-count { range '0..99'; } }
           leaf c { type small-count; default '7'; }
         }",
    );
    let leaf = ctx.find_node(mid, "/c").unwrap();
    let typ = ctx.node(leaf).leaf_type().unwrap();
    assert_eq!(typ.base, yangfold::schema::TypeBase::Uint16);
    assert_eq!(typ.name.as_str(), "small-count");
}

#[test]
fn test_union_member_rules() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module u { namespace 'urn:u'; prefix u;
               leaf l { type union { type string; type empty; } }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::InvalidValue(_)));

    load(
        &mut ctx,
        "module u2 { namespace 'urn:u2'; prefix u2;
           leaf l { type union { type int32; type string; } default 'abc'; }
         }",
    );
}

#[test]
fn test_check_id_holds_for_sealed_modules() {
    let mut ctx = Context::default();
    let mid = load(
        &mut ctx,
        "module ids { namespace 'urn:ids'; prefix ids;
           grouping g { leaf shared { type string; } }
           container c {
             uses g;
             choice pick {
               case one { leaf a { type string; } }
               leaf b { type string; }
             }
             list entries { key 'k'; leaf k { type string; } }
           }
         }",
    );
    fn walk(ctx: &Context, id: yangfold::NodeId) {
        ctx.check_id(id).unwrap();
        let mut cur = ctx.node(id).child;
        while let Some(c) = cur {
            walk(ctx, c);
            cur = ctx.node(c).next;
        }
    }
    let mut cur = ctx.module(mid).data;
    while let Some(id) = cur {
        walk(&ctx, id);
        cur = ctx.node(id).next;
    }
}

#[test]
fn test_unresolved_reference_reported() {
    let mut ctx = Context::default();
    let err = ctx
        .parse_module(
            "module m { namespace 'urn:m'; prefix m;
               container c { uses no-such-grouping; }
             }",
            Format::Yang,
        )
        .unwrap_err();
    assert!(matches!(err, YangError::UnresolvedReference(_)));
}
