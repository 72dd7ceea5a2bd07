//! Integration tests for the tag factory extension surface: handler
//! registration, parameters, services and the invalid-tag fallback.

mod common;

use std::sync::Arc;

use common::{create_test_factory, invalid_reason, text_handler};
use phpantom_docblock::docblock::{RESOLVE_TYPES_PARAMETER, TYPE_RESOLVER, TypeResolver};
use phpantom_docblock::{
    Description, Error, HandlerContext, HandlerError, HandlerResult, ServiceKey, Tag, TagBody,
    TagFactory, TypeContext,
};

// ─── Totality ───────────────────────────────────────────────────────────────

#[test]
fn unknown_tag_keeps_original_text() {
    let factory = TagFactory::new();
    let tag = factory.create("@customthing foo", None);
    assert!(tag.is_invalid());
    match tag.body() {
        TagBody::Invalid { text, reason } => {
            assert_eq!(text, "@customthing foo");
            assert_eq!(reason, "no handler registered for tag name \"customthing\"");
        }
        other => panic!("expected invalid tag, got {:?}", other),
    }
}

#[test]
fn param_handler_exposes_type_and_variable() {
    let factory = create_test_factory();
    let tag = factory.create("@param int $count", None);
    assert!(!tag.is_invalid());
    assert_eq!(tag.name(), "param");
    assert_eq!(tag.body().type_hint(), Some("int"));
    assert_eq!(tag.body().variable(), Some("count"));
}

#[test]
fn create_never_fails_on_odd_input() {
    let factory = create_test_factory();
    let inputs = [
        "@",
        "",
        "   ",
        "@param",
        "@return array<",
        "@method (",
        "@author <>",
        "@see",
        "@@",
        "@var {",
        "@param int $",
        "@ünïcödé stuff",
    ];
    for input in inputs {
        let tag = factory.create(input, None);
        assert!(!tag.name().is_empty(), "tag for {:?} has an empty name", input);
    }
}

#[test]
fn handler_failure_reason_is_reported() {
    let factory = create_test_factory();
    let tag = factory.create("@method string noParens", None);
    assert_eq!(invalid_reason(&tag), Some("missing parameter list"));
}

// ─── Registration ───────────────────────────────────────────────────────────

#[test]
fn last_registration_wins() {
    let factory = TagFactory::new();
    factory.register_tag_handler("x", |_: &str, _: &HandlerContext<'_>| -> HandlerResult {
        Ok(TagBody::Generic {
            description: Description::from_text("A"),
        })
    });
    let first = factory.create("@x", None);

    factory.register_tag_handler("x", |_: &str, _: &HandlerContext<'_>| -> HandlerResult {
        Ok(TagBody::Generic {
            description: Description::from_text("B"),
        })
    });
    let second = factory.create("@x", None);

    assert_eq!(
        first.body().description(),
        Some(&Description::from_text("A"))
    );
    assert_eq!(
        second.body().description(),
        Some(&Description::from_text("B"))
    );
}

#[test]
fn overriding_a_standard_grammar() {
    let factory = create_test_factory();
    factory.register_tag_handler("param", text_handler);
    let tag = factory.create("@param whatever you like", None);
    assert!(matches!(tag.body(), TagBody::Generic { .. }));
}

#[test]
fn register_by_id_aliases_standard_handlers() {
    let factory = create_test_factory();
    factory
        .register_tag_handler_by_id("phan-param", "param")
        .unwrap();
    let tag = factory.create("@phan-param string $s", None);
    assert_eq!(tag.body().variable(), Some("s"));

    let err = factory
        .register_tag_handler_by_id("phan-return", "returns")
        .unwrap_err();
    assert!(matches!(err, Error::UnknownHandler(_)));
    assert_eq!(err.to_string(), "unknown tag handler id: returns");
}

#[test]
fn parameters_last_write_wins() {
    let factory = TagFactory::new();
    factory.add_parameter("prefix", "a");
    factory.add_parameter("prefix", "b");
    factory.register_tag_handler("p", |body: &str, ctx: &HandlerContext<'_>| -> HandlerResult {
        let prefix = ctx
            .parameter("prefix")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        Ok(TagBody::Generic {
            description: Description::from_text(format!("{}{}", prefix, body)),
        })
    });

    let tag = factory.create("@p tail", None);
    assert_eq!(
        tag.body().description(),
        Some(&Description::from_text("btail"))
    );
}

trait Clock: Send + Sync {
    fn now(&self) -> &'static str;
}

struct Fixed(&'static str);

impl Clock for Fixed {
    fn now(&self) -> &'static str {
        self.0
    }
}

const CLOCK: ServiceKey<Arc<dyn Clock>> = ServiceKey::new("clock");

#[test]
fn services_last_write_wins_and_reach_handlers() {
    let factory = TagFactory::new();
    factory.add_service(CLOCK, Arc::new(Fixed("monday")) as Arc<dyn Clock>);
    factory.add_service(CLOCK, Arc::new(Fixed("tuesday")) as Arc<dyn Clock>);
    factory.register_tag_handler("stamp", |_: &str, ctx: &HandlerContext<'_>| -> HandlerResult {
        let clock = ctx
            .service(CLOCK)
            .ok_or_else(|| HandlerError::new("no clock"))?;
        Ok(TagBody::Generic {
            description: Description::from_text(clock.now()),
        })
    });

    let tag = factory.create("@stamp", None);
    assert_eq!(
        tag.body().description(),
        Some(&Description::from_text("tuesday"))
    );
}

#[test]
fn missing_service_turns_into_invalid_tag() {
    let factory = TagFactory::new();
    factory.register_tag_handler("stamp", |_: &str, ctx: &HandlerContext<'_>| -> HandlerResult {
        ctx.service(CLOCK).ok_or_else(|| HandlerError::new("no clock"))?;
        unreachable!()
    });
    let tag = factory.create("@stamp", None);
    assert_eq!(invalid_reason(&tag), Some("no clock"));
}

// ─── Type resolution ────────────────────────────────────────────────────────

#[test]
fn context_qualifies_class_names() {
    let factory = create_test_factory();
    let ctx = TypeContext::new("App\\Models").with_alias("Carbon", "Carbon\\Carbon");
    let tag = factory.create("@param User|Carbon|null $when", Some(&ctx));
    assert_eq!(
        tag.body().type_hint(),
        Some("\\App\\Models\\User|\\Carbon\\Carbon|null")
    );
}

#[test]
fn no_context_leaves_types_as_written() {
    let factory = create_test_factory();
    let tag = factory.create("@return Collection<int, User>", None);
    assert_eq!(tag.body().type_hint(), Some("Collection<int, User>"));
}

#[test]
fn resolve_types_parameter_disables_resolution() {
    let factory = create_test_factory();
    factory.add_parameter(RESOLVE_TYPES_PARAMETER, false);
    let ctx = TypeContext::new("App");
    let tag = factory.create("@throws NotFound", Some(&ctx));
    assert_eq!(tag.body().type_hint(), Some("NotFound"));
}

struct Upper;

impl TypeResolver for Upper {
    fn resolve(&self, raw: &str, _: &TypeContext) -> Result<String, HandlerError> {
        Ok(raw.to_uppercase())
    }
}

#[test]
fn type_resolver_service_can_be_replaced() {
    let factory = create_test_factory();
    factory.add_service(TYPE_RESOLVER, Arc::new(Upper) as Arc<dyn TypeResolver>);
    let ctx = TypeContext::new("");
    let tag = factory.create("@var string $s", Some(&ctx));
    assert_eq!(tag.body().type_hint(), Some("STRING"));
}

// ─── Concurrency ────────────────────────────────────────────────────────────

#[test]
fn concurrent_create_while_registering() {
    let factory = create_test_factory();
    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..200 {
                    let tag = factory.create("@param int $n", None);
                    assert_eq!(tag.body().variable(), Some("n"));
                }
            });
        }
        s.spawn(|| {
            for i in 0..50 {
                factory.add_parameter(format!("p{}", i), i);
                factory.register_tag_handler(format!("custom{}", i), text_handler);
            }
        });
    });
    assert!(factory.has_handler("custom49"));
}

// ─── Tag values ─────────────────────────────────────────────────────────────

#[test]
fn tag_equality_uses_name_and_specialization() {
    let factory = create_test_factory();
    let a = factory.create("@param int $a", None);
    let b = factory.create("@param string $b", None);
    assert_eq!(a, b);

    let special = Tag::new("param", Some("strict".to_string())).unwrap();
    assert_ne!(a, special);
    assert!(matches!(Tag::new("", None), Err(Error::InvalidArgument(_))));
}
