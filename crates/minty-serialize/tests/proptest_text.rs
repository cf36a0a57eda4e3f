//! Property tests for the text and JSON forms of node trees.

use minty_serialize::prelude::*;
use proptest::prelude::*;

fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just(String::new()),
        4 => "[A-Za-z][A-Za-z0-9_]{0,8}",
        3 => "[ -~\t\n\r]{1,10}",
    ]
}

fn data_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        2 => Just(String::new()),
        3 => "[ -~\n]{1,16}",
    ]
}

fn node_strategy() -> impl Strategy<Value = Node> {
    let leaf = (name_strategy(), data_strategy()).prop_map(|(name, data)| Node::leaf(name, data));
    leaf.prop_recursive(4, 48, 6, |inner| {
        (name_strategy(), data_strategy(), prop::collection::vec(inner, 0..6)).prop_map(
            |(name, data, children)| {
                let mut node = Node::leaf(name, data);
                for child in children {
                    node.add_child(child);
                }
                node
            },
        )
    })
}

fn root_strategy() -> impl Strategy<Value = Node> {
    (data_strategy(), prop::collection::vec(node_strategy(), 0..6)).prop_map(|(data, children)| {
        let mut root = Node::leaf("", data);
        for child in children {
            root.add_child(child);
        }
        root
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn text_form_restores_any_tree(root in root_strategy()) {
        let text = root.to_text();
        let parsed = Node::parse_text(&text).unwrap();
        prop_assert_eq!(parsed, root);
    }

    #[test]
    fn json_form_restores_any_tree(root in root_strategy()) {
        let json = serde_json::to_string(&root).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, root);
    }

    #[test]
    fn text_lines_match_node_count(root in root_strategy()) {
        let text = root.to_text();
        let root_line = usize::from(root.has_data());
        prop_assert_eq!(text.lines().count(), root.len_recursive() - 1 + root_line);
    }
}
