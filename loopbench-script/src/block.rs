//! Block Parser and Interpreter
//!
//! Parses tagged body lines into a statement tree and executes it against a
//! [`Scope`], driving the region probes of the current loop iteration.
//!
//! Nesting comes from the line levels computed by the extractor. Expressions
//! are compiled once, at parse time, with `evalexpr`.

use crate::scope::{Scope, truthy};
use crate::tagger::{Probe, TaggedLine};
use evalexpr::{ContextWithMutableVariables, Node, Value, build_operator_tree};
use loopbench_core::{BenchError, IterationProbe, Result};

/// Statement forms rejected by the runtime
const UNSUPPORTED: &[&str] = &[
    "def", "class", "import", "from", "return", "lambda", "try", "except", "finally", "with",
    "yield", "global", "nonlocal", "del", "raise", "async", "await", "assert",
];

#[derive(Debug)]
enum Stmt {
    Expr {
        node: Node,
        line: usize,
    },
    If {
        branches: Vec<(Node, Vec<Stmt>)>,
        orelse: Vec<Stmt>,
        line: usize,
    },
    While {
        cond: Node,
        body: Vec<Stmt>,
        line: usize,
    },
    For {
        var: String,
        iter: Node,
        body: Vec<Stmt>,
        line: usize,
    },
    Pass,
    Break,
    Continue,
    Probe(Probe),
}

/// How a statement sequence finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

/// A parsed, compiled iteration body.
#[derive(Debug)]
pub struct Program {
    function: String,
    stmts: Vec<Stmt>,
}

impl Program {
    /// Parse and compile `lines` belonging to `function`.
    pub fn parse(function: &str, lines: &[TaggedLine]) -> Result<Self> {
        let mut parser = Parser {
            function,
            lines,
            pos: 0,
            loop_depth: 0,
        };
        let stmts = parser.block(0)?;
        Ok(Self {
            function: function.to_string(),
            stmts,
        })
    }

    /// Execute one iteration of the body.
    pub fn run(&self, scope: &mut Scope, probe: &mut IterationProbe<'_>) -> Result<()> {
        let mut exec = Executor {
            function: &self.function,
            scope,
            probe,
        };
        exec.block(&self.stmts).map(|_| ())
    }
}

// ─── Parser ───

struct Parser<'a> {
    function: &'a str,
    lines: &'a [TaggedLine],
    pos: usize,
    loop_depth: usize,
}

impl<'a> Parser<'a> {
    fn block(&mut self, level: usize) -> Result<Vec<Stmt>> {
        let lines = self.lines;
        let mut stmts = Vec::new();

        while let Some(line) = lines.get(self.pos) {
            if line.level() < level {
                break;
            }
            match line {
                // Marker comments may be indented deeper than the code around them
                TaggedLine::Probe { probe, .. } => {
                    stmts.push(Stmt::Probe(probe.clone()));
                    self.pos += 1;
                }
                TaggedLine::Code(code) => {
                    if code.level > level {
                        return Err(self.compile_error(code.line, "unexpected indentation"));
                    }
                    self.pos += 1;
                    let stmt = self.statement(&code.text, code.line, level)?;
                    stmts.push(stmt);
                }
            }
        }
        Ok(stmts)
    }

    fn statement(&mut self, text: &str, line: usize, level: usize) -> Result<Stmt> {
        let keyword = leading_word(text);
        if UNSUPPORTED.contains(&keyword) {
            return Err(BenchError::UnsupportedStatement {
                function: self.function.to_string(),
                line,
                text: text.to_string(),
            });
        }

        match keyword {
            "pass" if text == "pass" => Ok(Stmt::Pass),
            "break" | "continue" if text == keyword => {
                if self.loop_depth == 0 {
                    return Err(self.compile_error(line, &format!("`{keyword}` outside a loop")));
                }
                Ok(if keyword == "break" {
                    Stmt::Break
                } else {
                    Stmt::Continue
                })
            }
            "if" => self.if_chain(text, line, level),
            "elif" | "else" => Err(self.compile_error(line, &format!("`{keyword}` without `if`"))),
            "while" => {
                let cond = self.compile(self.header(text, "while", line)?, line)?;
                let body = self.loop_body(line, level)?;
                Ok(Stmt::While { cond, body, line })
            }
            "for" => {
                let header = self.header(text, "for", line)?;
                let Some((var, iter)) = header.split_once(" in ") else {
                    return Err(self.compile_error(line, "expected `for <name> in <expression>:`"));
                };
                let var = var.trim();
                if !crate::callable::is_identifier(var) {
                    return Err(self.compile_error(line, &format!("`{var}` is not a loop variable")));
                }
                let iter = self.compile(iter, line)?;
                let body = self.loop_body(line, level)?;
                Ok(Stmt::For {
                    var: var.to_string(),
                    iter,
                    body,
                    line,
                })
            }
            _ => Ok(Stmt::Expr {
                node: self.compile(text, line)?,
                line,
            }),
        }
    }

    fn if_chain(&mut self, text: &str, line: usize, level: usize) -> Result<Stmt> {
        let cond = self.compile(self.header(text, "if", line)?, line)?;
        let mut branches = vec![(cond, self.suite(line, level)?)];
        let mut orelse = Vec::new();

        let lines = self.lines;
        while let Some(TaggedLine::Code(next)) = lines.get(self.pos) {
            if next.level != level {
                break;
            }
            match leading_word(&next.text) {
                "elif" => {
                    self.pos += 1;
                    let cond = self.compile(self.header(&next.text, "elif", next.line)?, next.line)?;
                    branches.push((cond, self.suite(next.line, level)?));
                }
                "else" if next.text.strip_prefix("else").map(str::trim) == Some(":") => {
                    self.pos += 1;
                    orelse = self.suite(next.line, level)?;
                    break;
                }
                _ => break,
            }
        }
        Ok(Stmt::If {
            branches,
            orelse,
            line,
        })
    }

    fn loop_body(&mut self, line: usize, level: usize) -> Result<Vec<Stmt>> {
        self.loop_depth += 1;
        let body = self.suite(line, level);
        self.loop_depth -= 1;
        body
    }

    /// The indented block following a header at `level`.
    fn suite(&mut self, line: usize, level: usize) -> Result<Vec<Stmt>> {
        let body = self.block(level + 1)?;
        if body.is_empty() {
            return Err(self.compile_error(line, "expected an indented block"));
        }
        Ok(body)
    }

    /// The expression part of `<keyword> <expression>:`.
    fn header<'t>(&self, text: &'t str, keyword: &str, line: usize) -> Result<&'t str> {
        text.strip_prefix(keyword)
            .and_then(|rest| rest.trim_end().strip_suffix(':'))
            .map(str::trim)
            .filter(|expr| !expr.is_empty())
            .ok_or_else(|| {
                self.compile_error(line, &format!("expected `{keyword} <expression>:`"))
            })
    }

    fn compile(&self, expr: &str, line: usize) -> Result<Node> {
        build_operator_tree(expr).map_err(|e| self.compile_error(line, &e.to_string()))
    }

    fn compile_error(&self, line: usize, message: &str) -> BenchError {
        BenchError::Compile {
            function: self.function.to_string(),
            line,
            message: message.to_string(),
        }
    }
}

fn leading_word(text: &str) -> &str {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or_default()
}

// ─── Interpreter ───

struct Executor<'e, 'p, 'n> {
    function: &'e str,
    scope: &'e mut Scope,
    probe: &'p mut IterationProbe<'n>,
}

impl Executor<'_, '_, '_> {
    fn block(&mut self, stmts: &[Stmt]) -> Result<Flow> {
        for stmt in stmts {
            let flow = self.statement(stmt)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expr { node, line } => {
                let value = self.eval(node, *line)?;
                loopbench_core::gc::dispose(value);
            }
            Stmt::If {
                branches,
                orelse,
                line,
            } => {
                for (cond, body) in branches {
                    if truthy(&self.eval(cond, *line)?) {
                        return self.block(body);
                    }
                }
                return self.block(orelse);
            }
            Stmt::While { cond, body, line } => {
                while truthy(&self.eval(cond, *line)?) {
                    if self.block(body)? == Flow::Break {
                        break;
                    }
                }
            }
            Stmt::For {
                var,
                iter,
                body,
                line,
            } => {
                for item in self.items(iter, *line)? {
                    self.assign(var, item, *line)?;
                    if self.block(body)? == Flow::Break {
                        break;
                    }
                }
            }
            Stmt::Pass => {}
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Probe(probe) => match probe {
                Probe::Start => self.probe.start(),
                Probe::Accumulate { .. } => {
                    self.probe.accumulate();
                }
                Probe::Guard { region } => self.probe.guard(region)?,
            },
        }
        Ok(Flow::Normal)
    }

    fn eval(&mut self, node: &Node, line: usize) -> Result<Value> {
        node.eval_with_context_mut(&mut *self.scope)
            .map_err(|e| self.runtime_error(line, e.to_string()))
    }

    fn assign(&mut self, var: &str, value: Value, line: usize) -> Result<()> {
        self.scope
            .set_value(var.to_string(), value)
            .map_err(|e| self.runtime_error(line, e.to_string()))
    }

    /// Values a `for` loop visits: tuple elements, `0..n` for an integer, or characters.
    fn items(&mut self, iter: &Node, line: usize) -> Result<Vec<Value>> {
        match self.eval(iter, line)? {
            Value::Tuple(items) => Ok(items),
            Value::Int(n) => Ok((0..n.max(0)).map(Value::Int).collect()),
            Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            Value::Empty => Ok(Vec::new()),
            other => Err(self.runtime_error(line, format!("cannot iterate over {other}"))),
        }
    }

    fn runtime_error(&self, line: usize, message: String) -> BenchError {
        BenchError::Runtime {
            function: self.function.to_string(),
            line,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SourceLine;

    fn code(level: usize, text: &str, line: usize) -> TaggedLine {
        TaggedLine::Code(SourceLine {
            level,
            text: text.to_string(),
            line,
        })
    }

    fn program(rows: &[(usize, &str)]) -> Result<Program> {
        let lines: Vec<TaggedLine> = rows
            .iter()
            .enumerate()
            .map(|(i, (level, text))| code(*level, text, i + 1))
            .collect();
        Program::parse("f", &lines)
    }

    fn run(program: &Program) -> Result<Scope> {
        let mut scope = Scope::with_prelude();
        let mut probe = IterationProbe::new("f", None);
        program.run(&mut scope, &mut probe)?;
        Ok(scope)
    }

    #[test]
    fn test_loops_and_conditionals() {
        let program = program(&[
            (0, "total = 0"),
            (0, "for i in range(10):"),
            (1, "if i % 2 == 0:"),
            (2, "continue"),
            (1, "elif i > 7:"),
            (2, "break"),
            (1, "else:"),
            (2, "total += i"),
            (0, "n = 3"),
            (0, "while n > 0:"),
            (1, "n -= 1"),
        ])
        .unwrap();

        let scope = run(&program).unwrap();
        // 1 + 3 + 5 + 7, then 9 breaks
        assert_eq!(scope.get("total"), Some(&Value::Int(16)));
        assert_eq!(scope.get("n"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_else_with_space_before_colon() {
        let program = program(&[
            (0, "if 1 > 2:"),
            (1, "x = 1"),
            (0, "else :"),
            (1, "x = 2"),
        ])
        .unwrap();
        let scope = run(&program).unwrap();
        assert_eq!(scope.get("x"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_for_over_integer_and_tuple() {
        let program = program(&[
            (0, "acc = \"\""),
            (0, "for s in seq(\"a\", \"b\"):"),
            (1, "acc = acc + s"),
            (0, "count = 0"),
            (0, "for _ in 4:"),
            (1, "count += 1"),
        ])
        .unwrap();
        let scope = run(&program).unwrap();
        assert_eq!(scope.get("acc"), Some(&Value::String("ab".into())));
        assert_eq!(scope.get("count"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_probes_drive_the_iteration_timer() {
        let lines = vec![
            code(0, "x = 1", 1),
            TaggedLine::Probe {
                level: 0,
                probe: Probe::Start,
                line: 2,
            },
            code(0, "y = sum(range(100))", 3),
            TaggedLine::Probe {
                level: 0,
                probe: Probe::Accumulate {
                    region: "y".into(),
                },
                line: 4,
            },
        ];
        let program = Program::parse("f", &lines).unwrap();
        let mut scope = Scope::with_prelude();
        let mut probe = IterationProbe::new("f", None);
        program.run(&mut scope, &mut probe).unwrap();

        assert_eq!(probe.regions(), 1);
        assert!(probe.elapsed() >= 0.0);
    }

    #[test]
    fn test_unsupported_statements() {
        for text in ["def g():", "return 1", "import os", "lambda: 1", "class A:"] {
            let err = program(&[(0, "x = 1"), (0, text)]).unwrap_err();
            assert!(
                matches!(err, BenchError::UnsupportedStatement { line: 2, .. }),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            program(&[(0, "break")]),
            Err(BenchError::Compile { line: 1, .. })
        ));
        assert!(matches!(
            program(&[(0, "if x:"), (0, "y = 1")]),
            Err(BenchError::Compile { line: 1, .. })
        ));
        assert!(matches!(
            program(&[(0, "x = 1"), (1, "y = 2")]),
            Err(BenchError::Compile { line: 2, .. })
        ));
        assert!(matches!(
            program(&[(0, "else:"), (1, "y = 2")]),
            Err(BenchError::Compile { line: 1, .. })
        ));
        assert!(matches!(
            program(&[(0, "x = (1 +")]),
            Err(BenchError::Compile { line: 1, .. })
        ));
    }

    #[test]
    fn test_runtime_error_names_the_line() {
        let program = program(&[(0, "x = 1"), (0, "y = undefined_name + 1")]).unwrap();
        let err = run(&program).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Runtime { ref function, line: 2, .. } if function == "f"
        ));
    }
}
