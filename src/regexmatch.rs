//! Regex vocabulary matcher: a hand-rolled Thompson-construction NFA
//! compiled to a small bytecode program, run with a lazily-memoized
//! transition cache so repeated scans of the vocabulary reuse prior work.
//!
//! Deliberately not built on the `regex` crate: matching is always against
//! whole vocabulary terms rather than arbitrary text, and the matcher
//! instance must own a persistent lazy-DFA cache across many `is_match`
//! calls, so a hand-rolled Thompson/Pike-VM construction is the better fit
//! here than a general-purpose text regex engine.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
enum Ast {
    Char(char),
    Dot,
    Class(Vec<(char, char)>, bool),
    Concat(Vec<Ast>),
    Alt(Vec<Ast>),
    Star(Box<Ast>),
    Plus(Box<Ast>),
    Question(Box<Ast>),
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    _marker: std::marker::PhantomData<&'a ()>,
}

impl<'a> Parser<'a> {
    fn new(pattern: &'a str) -> Self {
        Parser {
            chars: pattern.chars().collect(),
            pos: 0,
            _marker: std::marker::PhantomData,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn parse_pattern(&mut self) -> Result<Ast, String> {
        let ast = self.parse_alt()?;
        if self.pos != self.chars.len() {
            return Err(format!("unexpected character at position {}", self.pos));
        }
        Ok(ast)
    }

    fn parse_alt(&mut self) -> Result<Ast, String> {
        let mut branches = vec![self.parse_concat()?];
        while self.peek() == Some('|') {
            self.bump();
            branches.push(self.parse_concat()?);
        }
        if branches.len() == 1 {
            Ok(branches.pop().unwrap())
        } else {
            Ok(Ast::Alt(branches))
        }
    }

    fn parse_concat(&mut self) -> Result<Ast, String> {
        let mut parts = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            parts.push(self.parse_repeat()?);
        }
        if parts.is_empty() {
            return Err("empty expression".to_string());
        }
        if parts.len() == 1 {
            Ok(parts.pop().unwrap())
        } else {
            Ok(Ast::Concat(parts))
        }
    }

    fn parse_repeat(&mut self) -> Result<Ast, String> {
        let atom = self.parse_atom()?;
        match self.peek() {
            Some('*') => {
                self.bump();
                Ok(Ast::Star(Box::new(atom)))
            }
            Some('+') => {
                self.bump();
                Ok(Ast::Plus(Box::new(atom)))
            }
            Some('?') => {
                self.bump();
                Ok(Ast::Question(Box::new(atom)))
            }
            _ => Ok(atom),
        }
    }

    fn parse_atom(&mut self) -> Result<Ast, String> {
        match self.bump() {
            Some('(') => {
                let inner = self.parse_alt()?;
                if self.bump() != Some(')') {
                    return Err("unbalanced parenthesis".to_string());
                }
                Ok(inner)
            }
            Some('.') => Ok(Ast::Dot),
            Some('[') => self.parse_class(),
            Some('\\') => match self.bump() {
                Some(c) => Ok(Ast::Char(c)),
                None => Err("dangling escape".to_string()),
            },
            Some(c) => Ok(Ast::Char(c)),
            None => Err("unexpected end of pattern".to_string()),
        }
    }

    fn parse_class(&mut self) -> Result<Ast, String> {
        let negate = if self.peek() == Some('^') {
            self.bump();
            true
        } else {
            false
        };
        let mut ranges = Vec::new();
        let mut saw_any = false;
        loop {
            match self.peek() {
                None => return Err("unterminated character class".to_string()),
                Some(']') if saw_any => {
                    self.bump();
                    break;
                }
                _ => {
                    let lo = match self.bump() {
                        Some(']') if !saw_any => {
                            saw_any = true;
                            ranges.push((']', ']'));
                            continue;
                        }
                        Some(c) => c,
                        None => return Err("unterminated character class".to_string()),
                    };
                    saw_any = true;
                    if self.peek() == Some('-') && self.chars.get(self.pos + 1) != Some(&']') {
                        self.bump();
                        let hi = self.bump().ok_or("unterminated range in character class")?;
                        ranges.push((lo, hi));
                    } else {
                        ranges.push((lo, lo));
                    }
                }
            }
        }
        Ok(Ast::Class(ranges, negate))
    }
}

#[derive(Debug, Clone)]
enum Inst {
    Char(char),
    Dot,
    Class(Vec<(char, char)>, bool),
    Split(usize, usize),
    Jmp(usize),
    Match,
}

fn compile(ast: &Ast) -> Vec<Inst> {
    let mut program = Vec::new();
    emit(ast, &mut program);
    program.push(Inst::Match);
    program
}

fn emit(ast: &Ast, program: &mut Vec<Inst>) {
    match ast {
        Ast::Char(c) => program.push(Inst::Char(*c)),
        Ast::Dot => program.push(Inst::Dot),
        Ast::Class(ranges, negate) => program.push(Inst::Class(ranges.clone(), *negate)),
        Ast::Concat(parts) => {
            for part in parts {
                emit(part, program);
            }
        }
        Ast::Alt(branches) => emit_alt(branches, program),
        Ast::Star(inner) => {
            let split_pc = program.len();
            program.push(Inst::Split(0, 0));
            let body_start = program.len();
            emit(inner, program);
            program.push(Inst::Jmp(split_pc));
            let end = program.len();
            program[split_pc] = Inst::Split(body_start, end);
        }
        Ast::Plus(inner) => {
            let body_start = program.len();
            emit(inner, program);
            let split_pc = program.len();
            program.push(Inst::Split(body_start, split_pc + 1));
        }
        Ast::Question(inner) => {
            let split_pc = program.len();
            program.push(Inst::Split(0, 0));
            let body_start = program.len();
            emit(inner, program);
            let end = program.len();
            program[split_pc] = Inst::Split(body_start, end);
        }
    }
}

fn emit_alt(branches: &[Ast], program: &mut Vec<Inst>) {
    if branches.len() == 1 {
        emit(&branches[0], program);
        return;
    }
    let split_pc = program.len();
    program.push(Inst::Split(0, 0));
    let first_start = program.len();
    emit(&branches[0], program);
    let jmp_pc = program.len();
    program.push(Inst::Jmp(0));
    let rest_start = program.len();
    emit_alt(&branches[1..], program);
    let end = program.len();
    program[split_pc] = Inst::Split(first_start, rest_start);
    program[jmp_pc] = Inst::Jmp(end);
}

fn class_matches(ranges: &[(char, char)], negate: bool, c: char) -> bool {
    let found = ranges.iter().any(|&(lo, hi)| c >= lo && c <= hi);
    found != negate
}

fn epsilon_closure(program: &[Inst], seeds: &[usize]) -> Vec<usize> {
    let mut stack: Vec<usize> = seeds.to_vec();
    let mut seen = vec![false; program.len()];
    let mut closure = Vec::new();
    while let Some(pc) = stack.pop() {
        if seen[pc] {
            continue;
        }
        seen[pc] = true;
        match &program[pc] {
            Inst::Split(a, b) => {
                stack.push(*a);
                stack.push(*b);
            }
            Inst::Jmp(target) => stack.push(*target),
            _ => closure.push(pc),
        }
    }
    closure.sort_unstable();
    closure.dedup();
    closure
}

fn step(program: &[Inst], closure: &[usize], c: char) -> Vec<usize> {
    let mut next = Vec::new();
    for &pc in closure {
        let consumes = match &program[pc] {
            Inst::Char(expected) => *expected == c,
            Inst::Dot => true,
            Inst::Class(ranges, negate) => class_matches(ranges, *negate, c),
            _ => false,
        };
        if consumes {
            next.push(pc + 1);
        }
    }
    epsilon_closure(program, &next)
}

/// Lazily memoizes `(state set, char) -> next state set` so scanning the
/// same compiled pattern against many vocabulary terms reuses prior
/// transitions instead of re-deriving the closure every time.
#[derive(Default)]
struct LazyDfaCache {
    transitions: HashMap<(Vec<usize>, char), Vec<usize>>,
}

impl LazyDfaCache {
    fn transition(&mut self, program: &[Inst], closure: &[usize], c: char) -> Vec<usize> {
        let key = (closure.to_vec(), c);
        if let Some(cached) = self.transitions.get(&key) {
            return cached.clone();
        }
        let next = step(program, closure, c);
        self.transitions.insert(key, next.clone());
        next
    }
}

/// A compiled pattern, reusable across many `is_match` calls against a
/// lazily-cached transition table.
pub struct Matcher {
    program: Vec<Inst>,
    start: Vec<usize>,
    cache: LazyDfaCache,
}

impl Matcher {
    /// Compile `pattern`. The whole pattern is matched against the whole
    /// input (implicit `^...$` anchoring), matching vocabulary-term
    /// semantics rather than substring search.
    pub fn compile(pattern: &str) -> EngineResult<Self> {
        let mut parser = Parser::new(pattern);
        let ast = parser
            .parse_pattern()
            .map_err(|e| EngineError::InvalidInput(format!("invalid regex pattern: {e}")))?;
        let program = compile(&ast);
        let start = epsilon_closure(&program, &[0]);
        Ok(Matcher {
            program,
            start,
            cache: LazyDfaCache::default(),
        })
    }

    fn is_matching_state(&self, closure: &[usize]) -> bool {
        closure
            .iter()
            .any(|&pc| matches!(self.program[pc], Inst::Match))
    }

    /// Whether `text` matches the compiled pattern in its entirety.
    pub fn is_match(&mut self, text: &str) -> bool {
        let mut closure = self.start.clone();
        for c in text.chars() {
            if closure.is_empty() {
                return false;
            }
            closure = self.cache.transition(&self.program, &closure, c);
        }
        self.is_matching_state(&closure)
    }
}

/// Scan `vocabulary` for every term fully matching `pattern`, compiling the
/// pattern once and reusing the lazy transition cache across all terms.
pub fn find_matching_terms(pattern: &str, vocabulary: &[String]) -> EngineResult<Vec<String>> {
    let mut matcher = Matcher::compile(pattern)?;
    Ok(vocabulary
        .iter()
        .filter(|term| matcher.is_match(term))
        .cloned()
        .collect())
}
