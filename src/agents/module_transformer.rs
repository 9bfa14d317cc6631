use crate::agents::decorator_patch::{ListEntry, PatchStyle, register_entry};
use crate::agents::syntax::{BracketScanner, LineLexer, find_matching};
use crate::config::{ModwireConfig, QuoteStyle};
use crate::error::{ModwireError, Result};
use regex::Regex;
use std::io::{BufRead, Write};
use tracing::debug;

const BOM: &str = "\u{feff}";

/// What to add to a module declaration.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    pub class_name: &'a str,
    pub specifier: &'a str,
    pub key: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOutcome {
    /// The registration list did not exist and was created.
    pub created_list: bool,
    /// Import statements found before the decorator.
    pub existing_imports: usize,
}

/// Streaming rewriter for module declaration files.
///
/// Lines are copied through as they are read. Only the lines between the
/// most recent import and the decorator, and the decorator call itself, are
/// held in memory. Comments and string literals are skipped when looking for
/// imports and the decorator.
pub struct ModuleTransformer {
    decorator: String,
    decorator_regex: Regex,
    import_regex: Regex,
    import_end_regex: Regex,
    indent_unit: String,
    quote: QuoteStyle,
}

impl ModuleTransformer {
    pub fn new(config: &ModwireConfig) -> Result<Self> {
        let decorator_regex = Regex::new(&format!(r"@{}\s*\(", regex::escape(&config.decorator)))
            .map_err(|e| ModwireError::Config(format!("Invalid decorator pattern: {}", e)))?;
        let import_regex = Regex::new(r#"^\s*import[\s{*'"]"#)
            .map_err(|e| ModwireError::Config(format!("Invalid import pattern: {}", e)))?;
        let import_end_regex = Regex::new(r#"(;|(^|\s|\})from\s*['"][^'"]*['"]|^\s*import\s*['"][^'"]*['"])\s*$"#)
            .map_err(|e| ModwireError::Config(format!("Invalid import pattern: {}", e)))?;

        Ok(Self {
            decorator: config.decorator.clone(),
            decorator_regex,
            import_regex,
            import_end_regex,
            indent_unit: config.indent_unit(),
            quote: config.quote,
        })
    }

    /// Copies `reader` to `writer`, inserting the import and list entry of `registration`.
    pub fn transform<R, W>(
        &self,
        mut reader: R,
        writer: &mut W,
        registration: &Registration<'_>,
    ) -> Result<TransformOutcome>
    where
        R: BufRead,
        W: Write + ?Sized,
    {
        let mut state = TransformState {
            transformer: self,
            registration,
            phase: Phase::Prelude,
            prelude: Prelude::default(),
            lexer: LineLexer::new(),
            call: String::new(),
            open_paren: 0,
            scanner: BracketScanner::new(),
            eol: None,
            created_list: None,
        };

        let mut line = String::new();
        let mut first = true;
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            let mut text = line.as_str();
            if std::mem::take(&mut first) {
                if let Some(rest) = text.strip_prefix(BOM) {
                    writer.write_all(BOM.as_bytes())?;
                    text = rest;
                }
            }
            state.feed(text, writer)?;
        }

        state.finish()
    }

    fn import_line(&self, prelude: &Prelude, registration: &Registration<'_>) -> String {
        let quote = prelude.quote.unwrap_or(self.quote.as_char());
        let semicolon = if prelude.semicolon.unwrap_or(true) { ";" } else { "" };
        format!(
            "import {{{}}} from {quote}{}{quote}{semicolon}",
            registration.class_name, registration.specifier
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Prelude,
    Decorator,
    Tail,
}

/// Everything before the decorator.
///
/// Lines up to the end of the most recent import are already written;
/// `pending` holds the ones read since.
#[derive(Debug, Default)]
struct Prelude {
    pending: Vec<String>,
    open_import: Vec<String>,
    imports: usize,
    quote: Option<char>,
    semicolon: Option<bool>,
}

struct TransformState<'t, 'r> {
    transformer: &'t ModuleTransformer,
    registration: &'r Registration<'r>,
    phase: Phase,
    prelude: Prelude,
    lexer: LineLexer,
    call: String,
    open_paren: usize,
    scanner: BracketScanner,
    eol: Option<&'static str>,
    created_list: Option<bool>,
}

impl TransformState<'_, '_> {
    fn feed<W: Write + ?Sized>(&mut self, line: &str, writer: &mut W) -> Result<()> {
        if self.eol.is_none() && line.ends_with('\n') {
            self.eol = Some(if line.ends_with("\r\n") { "\r\n" } else { "\n" });
        }

        match self.phase {
            Phase::Prelude => self.feed_prelude(line, writer),
            Phase::Decorator => {
                self.call.push_str(line);
                if self.scanner.feed(line).is_some() {
                    self.patch_call(writer)?;
                }
                Ok(())
            }
            Phase::Tail => {
                writer.write_all(line.as_bytes())?;
                Ok(())
            }
        }
    }

    fn feed_prelude<W: Write + ?Sized>(&mut self, line: &str, writer: &mut W) -> Result<()> {
        let top_level = self.lexer.at_top_level();
        let code = self.lexer.mask(line);

        if !self.prelude.open_import.is_empty() {
            self.prelude.open_import.push(line.to_string());
            if self.transformer.import_end_regex.is_match(import_code(line)) {
                self.close_import(writer)?;
            }
            return Ok(());
        }

        if top_level && self.transformer.import_regex.is_match(&code) {
            for pending in self.prelude.pending.drain(..) {
                writer.write_all(pending.as_bytes())?;
            }
            self.prelude.imports += 1;
            self.prelude.open_import.push(line.to_string());
            if self.transformer.import_end_regex.is_match(import_code(line)) {
                self.close_import(writer)?;
            }
            return Ok(());
        }

        let Some(found) = self.transformer.decorator_regex.find(&code) else {
            self.prelude.pending.push(line.to_string());
            return Ok(());
        };

        debug!(
            target: "modwire::transform",
            "found @{} decorator",
            self.transformer.decorator
        );
        self.insert_import(writer)?;

        let open = found.end() - 1;
        self.call.push_str(line);
        self.open_paren = open;
        self.phase = Phase::Decorator;
        if self.scanner.feed(&line[open..]).is_some() {
            self.patch_call(writer)?;
        }
        Ok(())
    }

    fn close_import<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<()> {
        let lines = std::mem::take(&mut self.prelude.open_import);
        if let Some(last) = lines.last() {
            record_import_style(&mut self.prelude, last);
        }
        for line in &lines {
            writer.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    /// Writes the new import right after the last existing one, or at the top.
    fn insert_import<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<()> {
        let eol = self.eol.unwrap_or("\n");
        let import = self
            .transformer
            .import_line(&self.prelude, self.registration);
        let pending = std::mem::take(&mut self.prelude.pending);

        writer.write_all(import.as_bytes())?;
        writer.write_all(eol.as_bytes())?;
        if self.prelude.imports == 0 {
            let starts_blank = pending.first().is_some_and(|line| line.trim().is_empty());
            if !starts_blank {
                writer.write_all(eol.as_bytes())?;
            }
        }
        for line in &pending {
            writer.write_all(line.as_bytes())?;
        }

        debug!(
            target: "modwire::transform",
            imports = self.prelude.imports,
            "inserted import for {}",
            self.registration.class_name
        );
        Ok(())
    }

    fn patch_call<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<()> {
        let call = std::mem::take(&mut self.call);
        let close_paren = find_matching(call.as_bytes(), self.open_paren).ok_or_else(|| {
            ModwireError::Transform(format!(
                "@{} call is not terminated",
                self.transformer.decorator
            ))
        })?;

        let outcome = register_entry(
            &call,
            self.open_paren,
            close_paren,
            ListEntry {
                key: self.registration.key,
                class_name: self.registration.class_name,
            },
            PatchStyle {
                eol: self.eol.unwrap_or("\n"),
                indent_unit: &self.transformer.indent_unit,
            },
        )?;

        writer.write_all(outcome.text.as_bytes())?;
        self.created_list = Some(outcome.created_list);
        self.phase = Phase::Tail;
        Ok(())
    }

    fn finish(self) -> Result<TransformOutcome> {
        match self.phase {
            Phase::Tail => Ok(TransformOutcome {
                created_list: self.created_list.unwrap_or(false),
                existing_imports: self.prelude.imports,
            }),
            Phase::Decorator => Err(ModwireError::Transform(format!(
                "@{} call is not terminated",
                self.transformer.decorator
            ))),
            Phase::Prelude => Err(ModwireError::Transform(format!(
                "no @{} decorator found",
                self.transformer.decorator
            ))),
        }
    }
}

/// The line without its trailing whitespace and `//` comment.
fn import_code(line: &str) -> &str {
    let b = line.as_bytes();
    let mut quote = None;
    let mut i = 0;
    while i < b.len() {
        match (quote, b[i]) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), b'\\') => i += 1,
            (None, b'\'' | b'"' | b'`') => quote = Some(b[i]),
            (None, b'/') if b.get(i + 1) == Some(&b'/') => return line[..i].trim_end(),
            _ => {}
        }
        i += 1;
    }
    line.trim_end()
}

fn record_import_style(prelude: &mut Prelude, line: &str) {
    let code = import_code(line);
    prelude.semicolon = Some(code.ends_with(';'));
    prelude.quote = code
        .trim_end_matches(';')
        .trim_end()
        .chars()
        .last()
        .filter(|c| *c == '\'' || *c == '"');
}
