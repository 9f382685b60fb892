//! Property-based tests for the pattern algebra and the tree validator

use proptest::prelude::*;

use relaxng::namespaces::QName;
use relaxng::validators::{NameClass, PatternArena, PatternId, RelaxNgSchema};

#[derive(Debug, Clone)]
enum Shape {
    Leaf(usize),
    Choice(Box<Shape>, Box<Shape>),
    Group(Box<Shape>, Box<Shape>),
    Interleave(Box<Shape>, Box<Shape>),
    OneOrMore(Box<Shape>),
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    let leaf = (0usize..6).prop_map(Shape::Leaf);
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Shape::Choice(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Shape::Group(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Shape::Interleave(Box::new(a), Box::new(b))),
            inner.prop_map(|a| Shape::OneOrMore(Box::new(a))),
        ]
    })
}

fn leaves(arena: &mut PatternArena<'static>) -> Vec<PatternId> {
    let mut leaves = vec![PatternId::EMPTY, PatternId::TEXT, PatternId::NOT_ALLOWED];
    for local in ["a", "b"] {
        let name = arena.name_class(NameClass::Name(QName::local(local)));
        let id = arena.reserve_element(name);
        arena.fill_element(id, PatternId::TEXT);
        leaves.push(id);
    }
    leaves.push(arena.value("x", true));
    leaves
}

fn build(arena: &mut PatternArena<'_>, leaves: &[PatternId], shape: &Shape) -> PatternId {
    match shape {
        Shape::Leaf(i) => leaves[*i % leaves.len()],
        Shape::Choice(a, b) => {
            let (a, b) = (build(arena, leaves, a), build(arena, leaves, b));
            arena.choice(a, b)
        }
        Shape::Group(a, b) => {
            let (a, b) = (build(arena, leaves, a), build(arena, leaves, b));
            arena.group(a, b)
        }
        Shape::Interleave(a, b) => {
            let (a, b) = (build(arena, leaves, a), build(arena, leaves, b));
            arena.interleave(a, b)
        }
        Shape::OneOrMore(a) => {
            let a = build(arena, leaves, a);
            arena.one_or_more(a)
        }
    }
}

proptest! {
    #[test]
    fn test_choice_is_idempotent(shape in shape_strategy(), other in shape_strategy()) {
        let mut arena = PatternArena::new();
        let leaves = leaves(&mut arena);
        let p = build(&mut arena, &leaves, &shape);
        let q = build(&mut arena, &leaves, &other);

        prop_assert_eq!(arena.choice(p, p), p);
        let pq = arena.choice(p, q);
        prop_assert_eq!(arena.choice(pq, p), pq);
        prop_assert_eq!(arena.choice(pq, q), pq);
    }

    #[test]
    fn test_interleave_is_commutative(shape in shape_strategy(), other in shape_strategy()) {
        let mut arena = PatternArena::new();
        let leaves = leaves(&mut arena);
        let p = build(&mut arena, &leaves, &shape);
        let q = build(&mut arena, &leaves, &other);

        let before = arena.len();
        let pq = arena.interleave(p, q);
        let after_first = arena.len();
        let qp = arena.interleave(q, p);
        prop_assert_eq!(pq, qp);
        prop_assert_eq!(arena.len(), after_first);
        prop_assert!(after_first <= before + 1);
    }

    #[test]
    fn test_nullable_follows_constructors(shape in shape_strategy(), other in shape_strategy()) {
        let mut arena = PatternArena::new();
        let leaves = leaves(&mut arena);
        let p = build(&mut arena, &leaves, &shape);
        let q = build(&mut arena, &leaves, &other);
        let (np, nq) = (arena.nullable(p), arena.nullable(q));

        let choice = arena.choice(p, q);
        prop_assert_eq!(arena.nullable(choice), np || nq);
        let group = arena.group(p, q);
        prop_assert_eq!(arena.nullable(group), np && nq);
        let interleave = arena.interleave(p, q);
        prop_assert_eq!(arena.nullable(interleave), np && nq);
        let repeated = arena.one_or_more(p);
        prop_assert_eq!(arena.nullable(repeated), np);
    }

    #[test]
    fn test_layer_leaves_parent_untouched(shape in shape_strategy(), other in shape_strategy()) {
        let mut arena = PatternArena::new();
        let leaves = leaves(&mut arena);
        let p = build(&mut arena, &leaves, &shape);
        let before = arena.len();

        let mut layer = arena.layered();
        let q = build(&mut layer, &leaves, &other);
        let combined = layer.group(p, q);
        prop_assert!(combined.index() < layer.len());
        drop(layer);
        prop_assert_eq!(arena.len(), before);
    }

    #[test]
    fn test_item_lists(count in 0usize..12, padding in prop::collection::vec(0u8..3, 12)) {
        let schema = RelaxNgSchema::from_string(
            r#"<element name="list" xmlns="http://relaxng.org/ns/structure/1.0">
                 <oneOrMore><element name="item"><text/></element></oneOrMore>
               </element>"#,
        ).unwrap();

        let mut xml = String::from("<list>");
        for pad in padding.iter().take(count) {
            match pad {
                0 => xml.push_str("\n  "),
                1 => xml.push_str("<!-- gap -->"),
                _ => {}
            }
            xml.push_str("<item>value</item>");
        }
        xml.push_str("</list>");

        prop_assert_eq!(schema.is_valid_string(&xml), count > 0);
    }

    #[test]
    fn test_interleave_accepts_any_order(order in Just(vec!["a", "b", "c"]).prop_shuffle()) {
        let schema = RelaxNgSchema::from_string(
            r#"<element name="g" xmlns="http://relaxng.org/ns/structure/1.0">
                 <interleave>
                   <element name="a"><empty/></element>
                   <element name="b"><empty/></element>
                   <element name="c"><empty/></element>
                 </interleave>
               </element>"#,
        ).unwrap();

        let body: String = order.iter().map(|n| format!("<{}/>", n)).collect();
        let all = format!("<g>{}</g>", body);
        prop_assert!(schema.is_valid_string(&all));

        let partial: String = order.iter().skip(1).map(|n| format!("<{}/>", n)).collect();
        let missing = format!("<g>{}</g>", partial);
        prop_assert!(!schema.is_valid_string(&missing));
    }
}
