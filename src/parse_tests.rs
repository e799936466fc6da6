#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::html;
    use crate::options::TemplateOptions;
    use crate::parse::{compile_template, compile_template_str_with};
    use crate::placeholder::Value;
    use crate::vnode::{Callback, Child, Event, Rendered, VNode};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &'static str) -> Callback {
        let log = log.clone();
        Callback::new(move |event: &Event| {
            log.borrow_mut().push(format!("{}:{}", label, event.name));
            Ok(())
        })
    }

    #[test]
    fn test_node_sequence_is_flattened_into_parent() {
        let items = vec![
            VNode::element("li").with_child("one"),
            VNode::element("li").with_child("two"),
        ];
        let out = compile_template(&["<ul>", "</ul>"], vec![items.clone().into()]).unwrap();
        let ul = out.as_element().unwrap();
        assert_eq!(ul.tag, "ul");
        assert_eq!(
            ul.children,
            vec![Child::Element(items[0].clone()), Child::Element(items[1].clone())]
        );
    }

    #[test]
    fn test_sequence_at_top_level_forms_fragment() {
        let items = vec![VNode::element("a"), VNode::element("b")];
        let out = compile_template(&["", ""], vec![items.into()]).unwrap();
        match out {
            Rendered::Fragment(children) => {
                let tags: Vec<_> = children
                    .iter()
                    .filter_map(Child::as_element)
                    .map(|n| n.tag.as_str())
                    .collect();
                assert_eq!(tags, vec!["a", "b"]);
            }
            other => panic!("expected fragment, got {:?}", other),
        }
    }

    #[test]
    fn test_handlers_become_events_not_attributes() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let fn1 = recorder(&log, "fn1");
        let fn2 = recorder(&log, "fn2");

        let out = html!(
            "<button class=\"go\" onclick={} onmouseover={}>Go</button>",
            fn1.clone(),
            fn2.clone()
        )
        .unwrap();
        let button = out.as_element().unwrap();

        assert_eq!(button.events.len(), 2);
        assert_eq!(button.event("onclick"), Some(&fn1));
        assert_eq!(button.event("onmouseover"), Some(&fn2));
        assert_eq!(button.attribute("onclick"), None);
        assert_eq!(button.attribute("onmouseover"), None);
        assert_eq!(button.attribute("class"), Some("go"));

        button.event("onclick").unwrap().call(&Event::new("click")).unwrap();
        assert_eq!(*log.borrow(), vec!["fn1:click"]);
    }

    #[test]
    fn test_quoted_handler_position() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let click = recorder(&log, "click");
        let out = compile_template(
            &["<a href=\"#\" onclick=\"", "\">x</a>"],
            vec![click.clone().into()],
        )
        .unwrap();
        let a = out.as_element().unwrap();
        assert_eq!(a.event("onclick"), Some(&click));
        assert_eq!(a.attribute("href"), Some("#"));
    }

    #[test]
    fn test_legacy_event_token_form() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let click = recorder(&log, "click");
        let out = compile_template(
            &["<button onclick='data-m-event=\"", "\"'>x</button>"],
            vec![click.clone().into()],
        )
        .unwrap();
        let button = out.as_element().unwrap();
        assert_eq!(button.event("onclick"), Some(&click));
        assert!(button.attributes.is_empty());
    }

    #[test]
    fn test_text_values_are_escaped_and_raw_values_are_not() {
        let out = html!("<p>{}</p>", "<b>bold</b>").unwrap();
        let p = out.as_element().unwrap();
        assert_eq!(p.children, vec![Child::from("<b>bold</b>")]);

        let out = html!("<p>{}</p>", Value::Raw("<b>bold</b>".into())).unwrap();
        let p = out.as_element().unwrap();
        assert_eq!(p.element_children().next().unwrap().tag, "b");
    }

    #[test]
    fn test_attribute_value_interpolation() {
        let out = html!("<input type=\"text\" value={} placeholder=\"{}\">", "a b", "it's").unwrap();
        let input = out.as_element().unwrap();
        assert_eq!(input.attribute("value"), Some("a b"));
        assert_eq!(input.attribute("placeholder"), Some("it's"));
    }

    #[test]
    fn test_nested_interpolation() {
        let inner = html!("<span>{}</span>", "in").unwrap();
        let out = html!("<div>{}<em>{}</em></div>", inner, 3).unwrap();
        let div = out.as_element().unwrap();
        assert_eq!(div.text_content(), "in3");
        let tags: Vec<_> = div.element_children().map(|n| n.tag.as_str()).collect();
        assert_eq!(tags, vec!["span", "em"]);
    }

    #[test]
    fn test_optional_and_empty_values() {
        let none: Option<VNode> = None;
        let out = html!("<div>{}</div>", none).unwrap();
        assert!(out.as_element().unwrap().children.is_empty());

        let out = html!("<div>{}</div>", Some("yes")).unwrap();
        assert_eq!(out.as_element().unwrap().text_content(), "yes");
    }

    #[test]
    fn test_compile_is_idempotent() {
        let click = Callback::new(|_| Ok(()));
        let item = VNode::element("li").with_child("x");
        let compile = || {
            html!(
                "<ul onclick={}>{}</ul>",
                click.clone(),
                vec![item.clone(), item.clone()]
            )
            .unwrap()
        };
        assert_eq!(compile(), compile());
    }

    #[test]
    fn test_nodes_dropped_by_parser_are_reported() {
        let options = vec![
            VNode::element("option").with_child("a"),
            VNode::element("option").with_child("b"),
        ];
        let err = compile_template(&["<select>", "</select>"], vec![options.into()]).unwrap_err();
        assert_eq!(err, Error::UnresolvedPlaceholder { id: 0 });
        assert_eq!(err.code(), "TPL002");
    }

    #[test]
    fn test_sentinel_lookalikes_in_static_markup_are_plain_markup() {
        let out = compile_template(
            &["<div><m-placeholder id=\"7\"></m-placeholder></div>"],
            vec![],
        )
        .unwrap();
        let inner = out.as_element().unwrap().element_children().next().unwrap();
        assert_eq!(inner.tag, "m-placeholder");
        assert_eq!(inner.attribute("id"), Some("7"));

        let click = Callback::new(|_| Ok(()));
        let out = html!(
            "<button title=\"m-ev-0\" data-x=\"m-ev-99999999-0\" onclick={}>x</button>",
            click.clone()
        )
        .unwrap();
        let button = out.as_element().unwrap();
        assert_eq!(button.attribute("title"), Some("m-ev-0"));
        assert_eq!(button.attribute("data-x"), Some("m-ev-99999999-0"));
        assert_eq!(button.events.len(), 1);
        assert_eq!(button.event("onclick"), Some(&click));
    }

    #[test]
    fn test_node_after_bare_less_than_is_kept() {
        let out = compile_template(&["<p>1 < 2 ", "</p>"], vec![VNode::element("em").into()])
            .unwrap();
        let p = out.as_element().unwrap();
        assert_eq!(p.element_children().count(), 1);
        assert_eq!(p.text_content(), "1 < 2 ");

        let out = html!("<p>x <{}</p>", "b>").unwrap();
        let p = out.as_element().unwrap();
        assert_eq!(p.element_children().count(), 0);
        assert_eq!(p.text_content(), "x <b>");
    }

    #[test]
    fn test_whitespace_between_inline_elements_is_kept() {
        let out = html!("<p><b>a</b> <i>b</i></p>").unwrap();
        let p = out.as_element().unwrap();
        assert_eq!(p.children.len(), 3);
        assert_eq!(p.text_content(), "a b");
    }

    #[test]
    fn test_keep_whitespace_option() {
        let options = TemplateOptions {
            keep_whitespace: true,
            ..Default::default()
        };
        let out = compile_template_str_with(&options, "<b>a</b> <i>b</i>", vec![]).unwrap();
        assert_eq!(out.children().len(), 3);

        let out = html!("<b>a</b> <i>b</i>\n").unwrap();
        assert_eq!(out.children().len(), 2);

        let out = html!("\n  <ul>\n  <li>x</li>\n</ul>\n").unwrap();
        let ul = out.as_element().unwrap();
        assert_eq!(ul.children.len(), 3);
    }

    #[test]
    fn test_escaped_braces_in_string_template() {
        let out = html!("<style>p {{}} </style><p>{}</p>", "hi").unwrap();
        let style = out.children()[0].as_element().unwrap();
        assert_eq!(style.text_content(), "p {} ");
        let p = out.children()[1].as_element().unwrap();
        assert_eq!(p.text_content(), "hi");
    }

    #[test]
    fn test_full_document_keeps_head_and_body() {
        let out = html!("<html><head><title>t</title></head><body><p>x</p></body></html>").unwrap();
        let tags: Vec<_> = out
            .children()
            .iter()
            .filter_map(Child::as_element)
            .map(|n| n.tag.as_str())
            .collect();
        assert_eq!(tags, vec!["head", "body"]);
    }
}
