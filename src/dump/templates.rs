//! Template expansion for page text.
//!
//! Every definition of every template namespace is compiled once into a
//! pattern matching `{{[Namespace:]Name|args...}}`. For each page the
//! definitions are applied in registry order; each one is expanded until it no
//! longer matches, with a hard cap on the number of expansions so a template
//! whose body re-introduces its own invocation cannot hang the run.
//!
//! Arguments are split on every `|`, so a link like `[[Page|Label]]` passed as
//! an argument ends up in two positional arguments.

use regex::{Regex, RegexBuilder};

use crate::dump::model::{Namespace, Page};
use crate::errors::{MigrateError, Result};

/// Default upper bound of expansions of one template on one page.
pub const DEFAULT_MAX_EXPANSIONS: usize = 1000;

/// One definition ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub title: String,
    pub body: String,
    pattern: Regex,
}

impl CompiledTemplate {
    /// Byte range of the first invocation in `text`, if any.
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        self.pattern.find(text).map(|m| (m.start(), m.end()))
    }
}

/// Build the pattern matching an invocation of `name`, optionally qualified
/// with `namespace`. Matching is case-insensitive and the argument portion may
/// not contain a closing brace.
pub fn invocation_pattern(namespace: &str, name: &str) -> Result<Regex> {
    let source = format!(
        r"\{{\{{(?:{}:)?{}\s*(?:\|[^}}]*)?\}}\}}",
        regex::escape(namespace),
        regex::escape(name.trim())
    );
    RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .map_err(|e| MigrateError::parse(format!("bad template pattern for {:?}: {}", name, e)))
}

/// Expands template invocations in page text.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    templates: Vec<CompiledTemplate>,
    max_expansions: usize,
}

impl TemplateResolver {
    /// Compile every definition of `namespaces`, keeping registry order.
    pub fn new(namespaces: &[Namespace], max_expansions: usize) -> Result<Self> {
        let mut templates = Vec::new();
        for ns in namespaces {
            for def in &ns.definitions {
                let name = ns.bare_name(&def.title);
                templates.push(CompiledTemplate {
                    title: def.title.clone(),
                    body: def.body.clone(),
                    pattern: invocation_pattern(&ns.name, name)?,
                });
            }
        }
        Ok(Self {
            templates,
            max_expansions,
        })
    }

    pub fn templates(&self) -> &[CompiledTemplate] {
        &self.templates
    }

    /// Resolve the working text of every page in place. Returns how many
    /// pages changed.
    pub fn resolve_pages(&self, pages: &mut [Page]) -> Result<usize> {
        let mut changed = 0usize;
        for page in pages.iter_mut() {
            let resolved = self.resolve_text(page.title(), page.text())?;
            if resolved != page.text() {
                page.set_text(resolved);
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Expand every template in `text`. `page` is only used for reporting.
    pub fn resolve_text(&self, page: &str, text: &str) -> Result<String> {
        let mut text = text.to_owned();
        for template in &self.templates {
            text = self.expand(page, text, template)?;
        }
        Ok(text)
    }

    fn expand(&self, page: &str, mut text: String, template: &CompiledTemplate) -> Result<String> {
        let mut iterations = 0usize;
        while let Some((start, end)) = template.find(&text) {
            if iterations == self.max_expansions {
                return Err(MigrateError::did_not_converge(
                    page,
                    &template.title,
                    iterations,
                ));
            }
            let expansion = substitute_parameters(&text[start..end], &template.body);
            log::trace!("{:?}: {:?} -> {:?}", page, &text[start..end], expansion);
            text.replace_range(start..end, &expansion);
            iterations += 1;
        }
        if iterations > 0 {
            log::debug!(
                "{:?}: expanded {} {} time(s)",
                page,
                template.title,
                iterations
            );
        }
        Ok(text)
    }
}

/// Key/value pairs of a macro invocation body (without the outer braces).
///
/// The first part is the macro name and is skipped. A part with a `=` after
/// its first character is a named argument; any other part gets its 1-based
/// position as key.
pub fn macro_arguments(content: &str) -> Vec<(String, String)> {
    content
        .split('|')
        .enumerate()
        .skip(1)
        .map(|(pos, part)| match part.find('=') {
            Some(eq) if eq > 0 => (part[..eq].to_owned(), part[eq + 1..].to_owned()),
            _ => (pos.to_string(), part.to_owned()),
        })
        .collect()
}

/// Fill the placeholders of `body` with the arguments of `reference`.
///
/// `reference` is a complete `{{...}}` invocation. Placeholders without a
/// matching argument are left as they are. A reference that isn't of that
/// shape returns the body unchanged.
pub fn substitute_parameters(reference: &str, body: &str) -> String {
    if reference.len() <= 4 || !reference.starts_with("{{") || !reference.ends_with("}}") {
        return body.to_owned();
    }
    let content = &reference[2..reference.len() - 2];
    let mut result = body.to_owned();
    for (key, value) in macro_arguments(content) {
        result = result.replace(&format!("{{{{{{{}}}}}}}", key), &value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::model::TemplateDefinition;

    fn registry(defs: &[(&str, &str)]) -> Vec<Namespace> {
        let mut ns = Namespace::new("Template", "10");
        for (title, body) in defs {
            ns.push(TemplateDefinition::new(*title, *body));
        }
        vec![ns]
    }

    fn resolve(defs: &[(&str, &str)], text: &str) -> String {
        TemplateResolver::new(&registry(defs), DEFAULT_MAX_EXPANSIONS)
            .unwrap()
            .resolve_text("Test", text)
            .unwrap()
    }

    #[test]
    fn positional_parameters() {
        let out = resolve(
            &[("Template:Greet", "Hello {{{1}}}, {{{2}}}!")],
            "{{Greet|World|Friend}}",
        );
        assert_eq!(out, "Hello World, Friend!");
    }

    #[test]
    fn named_parameter_and_explicit_position() {
        let out = resolve(
            &[("Template:Greet", "{{{name}}} and {{{2}}}")],
            "{{Greet|name=World|2=Friend}}",
        );
        assert_eq!(out, "World and Friend");
    }

    #[test]
    fn namespace_prefix_is_optional_and_case_insensitive() {
        let defs = [("Template:Hint", "<{{{1}}}>")];
        assert_eq!(resolve(&defs, "a {{template:hint|x}} b"), "a <x> b");
        assert_eq!(resolve(&defs, "{{HINT|y}}"), "<y>");
        assert_eq!(resolve(&defs, "{{Hint}}"), "<{{{1}}}>");
    }

    #[test]
    fn every_occurrence_is_expanded() {
        let out = resolve(&[("Template:B", "[{{{1}}}]")], "{{B|1}} and {{B|2}} and {{b|3}}");
        assert_eq!(out, "[1] and [2] and [3]");
    }

    #[test]
    fn longer_names_are_not_invocations() {
        let out = resolve(&[("Template:Greet", "X")], "{{Greeting|a}} {{Greet}}");
        assert_eq!(out, "{{Greeting|a}} X");
    }

    #[test]
    fn unresolved_placeholders_stay() {
        let out = resolve(&[("Template:T", "{{{1}}}-{{{missing}}}")], "{{T|a}}");
        assert_eq!(out, "a-{{{missing}}}");
    }

    #[test]
    fn every_pipe_splits_arguments() {
        let out = resolve(
            &[("Template:See", "see {{{1}}} / {{{2}}}")],
            "{{See|[[Page|Label]]}}",
        );
        assert_eq!(out, "see [[Page / Label]]");
    }

    #[test]
    fn angle_brackets_are_plain_argument_text() {
        let defs = [("Template:Cmp", "{{{1}}} then {{{2}}}")];
        assert_eq!(resolve(&defs, "{{Cmp|1<2|yes}}"), "1<2 then yes");

        let defs = [("Template:Cmp", "[{{{a}}}] [{{{b}}}]")];
        assert_eq!(resolve(&defs, "{{Cmp|a=x<y|b=z}}"), "[x<y] [z]");
    }

    #[test]
    fn whitespace_between_name_and_arguments() {
        let defs = [("Template:Greet", "Hi {{{1}}}")];
        assert_eq!(resolve(&defs, "{{Greet |a}}"), "Hi a");
        assert_eq!(resolve(&defs, "{{Greet\n|b}}"), "Hi b");
        assert_eq!(resolve(&defs, "{{Greet }}"), "Hi {{{1}}}");
        assert_eq!(resolve(&defs, "{{Greet x|c}}"), "{{Greet x|c}}");
    }

    #[test]
    fn values_are_inserted_literally() {
        let out = resolve(&[("Template:Price", "costs {{{1}}}")], "{{Price|$1 \\o/}}");
        assert_eq!(out, "costs $1 \\o/");
    }

    #[test]
    fn resolving_twice_is_a_noop() {
        let defs = [("Template:Greet", "Hello {{{1}}}!")];
        let once = resolve(&defs, "{{Greet|World}} {{Other|x}}");
        let twice = resolve(&defs, &once);
        assert_eq!(once, "Hello World! {{Other|x}}");
        assert_eq!(once, twice);
    }

    #[test]
    fn definitions_apply_in_registry_order() {
        // A's body invokes B; B comes later in the registry so it is expanded.
        let out = resolve(
            &[("Template:A", "({{B|{{{1}}}}})"), ("Template:B", "<{{{1}}}>")],
            "{{A|x}}",
        );
        assert_eq!(out, "(<x>)");

        // The other way round B has already been swept when A introduces it.
        let out = resolve(
            &[("Template:B", "<{{{1}}}>"), ("Template:A", "({{B|{{{1}}}}})")],
            "{{A|x}}",
        );
        assert_eq!(out, "({{B|x}})");
    }

    #[test]
    fn self_referencing_template_does_not_converge() {
        let resolver = TemplateResolver::new(&registry(&[("Template:Loop", "{{Loop}}")]), 25).unwrap();
        let err = resolver.resolve_text("Main Page", "{{Loop}}").unwrap_err();
        match err {
            MigrateError::ExpansionDidNotConverge {
                page,
                template,
                iterations,
            } => {
                assert_eq!(page, "Main Page");
                assert_eq!(template, "Template:Loop");
                assert_eq!(iterations, 25);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn resolve_pages_mutates_working_text_only() {
        let resolver =
            TemplateResolver::new(&registry(&[("Template:Greet", "Hi {{{1}}}")]), 10).unwrap();
        let mut pages = vec![
            Page::new("P", "{{Greet|Bob}}", "a", None),
            Page::new("Q", "no templates", "a", None),
        ];
        assert_eq!(resolver.resolve_pages(&mut pages).unwrap(), 1);
        assert_eq!(pages[0].text(), "Hi Bob");
        assert_eq!(pages[0].original(), "{{Greet|Bob}}");
    }

    #[test]
    fn malformed_reference_returns_body() {
        assert_eq!(substitute_parameters("{{}}", "body"), "body");
        assert_eq!(substitute_parameters("Greet|a", "body {{{1}}}"), "body {{{1}}}");
    }

    #[test]
    fn macro_arguments_keys() {
        let args = macro_arguments("Greet|a|k=v|=x|[[P|L]]");
        assert_eq!(
            args,
            vec![
                ("1".to_string(), "a".to_string()),
                ("k".to_string(), "v".to_string()),
                ("3".to_string(), "=x".to_string()),
                ("4".to_string(), "[[P".to_string()),
                ("5".to_string(), "L]]".to_string()),
            ]
        );
    }
}
