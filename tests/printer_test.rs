use yangfold::printer::{info, tree, yang, yin};
use yangfold::{Context, Format};

const MODULE: &str = "module net { namespace 'urn:net'; prefix n;
  revision 2023-11-05 { description 'Initial revision.'; }
  feature metrics;
  identity transport;
  identity tcp { base transport; }
  typedef port { type uint16 { range '1..65535'; } }

  grouping endpoint {
    leaf host { type string; }
    leaf port { type port; default '80'; }
  }

  container server {
    presence 'server is configured';
    uses endpoint;
    leaf-list alias { type string; ordered-by user; }
    list route { key 'dest'; unique 'metric';
      leaf dest { type string; }
      leaf metric { type uint32; }
    }
    choice mode {
      default plain;
      leaf plain { type empty; }
      leaf tls { type empty; }
    }
  }

  rpc restart { input { leaf delay { type uint32; } } }
  notification started { leaf at { type string; } }
}";

/// Round-trip idempotence: parsing the printed form of a parsed module
/// reaches a fixed point.
#[test]
fn test_yang_round_trip_idempotent() {
    let mut ctx = Context::default();
    let mid = ctx.parse_module(MODULE, Format::Yang).unwrap();
    let printed = yang::print_module(&ctx, mid);

    let mut ctx2 = Context::default();
    let mid2 = ctx2.parse_module(&printed, Format::Yang).unwrap();
    let printed2 = yang::print_module(&ctx2, mid2);
    assert_eq!(printed, printed2);

    // and the reloaded schema answers the same questions
    assert!(ctx2.find_node(mid2, "/server/host").is_some());
    assert!(ctx2.find_node(mid2, "/server/route/metric").is_some());
    assert_eq!(ctx2.module(mid2).features.len(), 1);
    assert_eq!(ctx2.module(mid2).identities.len(), 2);
}

#[test]
fn test_yin_round_trip() {
    let mut ctx = Context::default();
    let mid = ctx.parse_module(MODULE, Format::Yang).unwrap();
    let yin_text = yin::print_module(&ctx, mid).unwrap();

    let mut ctx2 = Context::default();
    let mid2 = ctx2.parse_module(&yin_text, Format::Yin).unwrap();
    assert!(ctx2.find_node(mid2, "/server/port").is_some());
    assert_eq!(
        ctx2.module(mid2).revision().unwrap().as_str(),
        "2023-11-05"
    );
}

#[test]
fn test_tree_view() {
    let mut ctx = Context::default();
    let mid = ctx.parse_module(MODULE, Format::Yang).unwrap();
    let out = tree::print_module(&ctx, mid);

    assert!(out.starts_with("module: net"));
    // presence container marker and the instantiated grouping leaf
    assert!(out.contains("+--rw server!"));
    assert!(out.contains("host?"));
    assert!(out.contains("route* [dest]"));
    assert!(out.contains("(mode)?"));
    assert!(out.contains("rpcs:"));
    assert!(out.contains("notifications:"));
}

#[test]
fn test_info_summary() {
    let mut ctx = Context::default();
    let mid = ctx.parse_module(MODULE, Format::Yang).unwrap();
    ctx.features_enable(mid, "metrics").unwrap();
    let out = info::print_module(&ctx, mid);

    assert!(out.contains("Module:       net"));
    assert!(out.contains("Namespace:    urn:net"));
    assert!(out.contains("Revision:     2023-11-05"));
    assert!(out.contains("Feature:      metrics (on)"));
    assert!(out.contains("Identity:     tcp (base transport)"));
    assert!(out.contains("Typedef:      port (uint16)"));
}
