//! Queries over real Rust source parsed with tree-sitter

use node_query::{parse_rust, Adapter, NodeQuery, QueryOptions, RuleSet, TreeSitterAdapter};
use tree_sitter::Node;

const SOURCE: &str = r#"
struct Point { x: i32, y: i32 }

impl Point {
    fn new(x: i32, y: i32) -> Self { Point { x, y } }
    fn origin() -> Self { Self::new(0, 0) }
    fn scale(&self, factor: i32) -> Point { Point::new(self.x * factor, self.y * factor) }
}

fn main() {
    let p = Point::new(1, 2);
    let limit = 0x10;
    let flag = true;
    let steps = [1, 2, 3];
    println!("{} {} {} {:?}", p.x, limit, flag, steps);
}
"#;

fn names(adapter: &TreeSitterAdapter<'_>, nodes: &[Node<'_>]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| match node.child_by_field_name("name") {
            Some(name) => adapter.source(&name),
            None => adapter.source(node),
        })
        .collect()
}

fn query<'t>(adapter: &TreeSitterAdapter<'t>, root: Node<'t>, text: &str) -> Vec<Node<'t>> {
    NodeQuery::new(text, adapter)
        .unwrap()
        .query_nodes(&root, QueryOptions::default())
        .unwrap()
}

#[test]
fn functions_by_name_and_arity() {
    let tree = parse_rust(SOURCE).unwrap();
    let adapter = TreeSitterAdapter::new(SOURCE);
    let root = tree.root_node();

    let main = query(&adapter, root, ".function_item[name=main]");
    assert_eq!(names(&adapter, &main), vec!["main"]);

    let binary = query(&adapter, root, ".function_item[parameters.size=2]");
    assert_eq!(names(&adapter, &binary), vec!["new", "scale"]);

    let nullary = query(&adapter, root, ".function_item[parameters.size=0]");
    assert_eq!(names(&adapter, &nullary), vec!["origin", "main"]);

    let matched = query(&adapter, root, ".function_item[name=~/^(new|origin)$/]");
    assert_eq!(names(&adapter, &matched), vec!["new", "origin"]);
}

#[test]
fn declaration_lists_are_transparent_to_child_matching() {
    let tree = parse_rust(SOURCE).unwrap();
    let adapter = TreeSitterAdapter::new(SOURCE);
    let root = tree.root_node();

    let methods = query(&adapter, root, ".impl_item > .function_item");
    assert_eq!(names(&adapter, &methods), vec!["new", "origin", "scale"]);

    let opaque = TreeSitterAdapter::new(SOURCE).with_transparent_kinds(Vec::<String>::new());
    assert!(query(&opaque, root, ".impl_item > .function_item").is_empty());
}

#[test]
fn literal_values_are_coerced() {
    let tree = parse_rust(SOURCE).unwrap();
    let adapter = TreeSitterAdapter::new(SOURCE);
    let root = tree.root_node();

    let hex = query(&adapter, root, ".let_declaration[value=16]");
    assert_eq!(names(&adapter, &hex), vec!["let limit = 0x10;"]);

    let flag = query(&adapter, root, ".let_declaration[value=true]");
    assert_eq!(names(&adapter, &flag), vec!["let flag = true;"]);

    let steps = query(&adapter, root, ".let_declaration[value=(1 2 3)]");
    assert_eq!(names(&adapter, &steps), vec!["let steps = [1, 2, 3];"]);

    let calls = query(&adapter, root, ".call_expression[arguments.size=2][arguments.0=1]");
    assert_eq!(names(&adapter, &calls), vec!["Point::new(1, 2)"]);
}

#[test]
fn calls_and_pseudo_classes() {
    let tree = parse_rust(SOURCE).unwrap();
    let adapter = TreeSitterAdapter::new(SOURCE);
    let root = tree.root_node();

    let calls = query(&adapter, root, ".call_expression[function=Point::new]");
    assert_eq!(calls.len(), 2);

    let printing = query(&adapter, root, ".function_item:has(.macro_invocation)");
    assert_eq!(names(&adapter, &printing), vec!["main"]);

    let quiet = query(&adapter, root, ".function_item:not_has(.call_expression)");
    assert_eq!(names(&adapter, &quiet), vec!["new"]);
}

#[test]
fn stop_at_first_match_returns_the_first_in_source_order() {
    let tree = parse_rust(SOURCE).unwrap();
    let adapter = TreeSitterAdapter::new(SOURCE);
    let options = QueryOptions::default().stop_at_first_match(true);

    let query = NodeQuery::new(".function_item", &adapter).unwrap();
    let first = query.query_nodes(&tree.root_node(), options).unwrap();
    assert_eq!(names(&adapter, &first), vec!["new"]);
}

#[test]
fn rule_sets_agree_with_query_text() {
    let tree = parse_rust(SOURCE).unwrap();
    let adapter = TreeSitterAdapter::new(SOURCE);
    let root = tree.root_node();

    let rules = RuleSet::from_json(r#"{"node_type": "function_item", "parameters": {"size": {"lte": 0}}}"#)
        .unwrap();
    let by_rules = NodeQuery::from_rules(rules, &adapter)
        .query_nodes(&root, QueryOptions::default())
        .unwrap();
    let by_text = query(&adapter, root, ".function_item[parameters.size<=0]");
    assert_eq!(by_rules, by_text);
    assert_eq!(names(&adapter, &by_rules), vec!["origin", "main"]);
}
