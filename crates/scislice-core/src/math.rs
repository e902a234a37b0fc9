//! Mathematical expression normalisation and analysis.
//!
//! `normalize` rewrites LaTeX and Unicode notation into a plain ASCII form
//! that is invariant under notation choice: `\frac{a}{b}`, `a \div b`, and
//! `a/b` all normalise to the same string. The rewriting is idempotent, so
//! normalising an already-normalised expression is a no-op. Tokenisation,
//! k-gram windows, variable/operator extraction, and the complexity score
//! are all computed from the normalised form; the original markup is always
//! retained untouched.

use std::collections::BTreeSet;

use regex::Regex;
use scislice_config::ProcessingConfig;

use crate::models::{EquationType, MathematicalContent};

/// Function and keyword names that survive tokenisation whole and count as
/// operators rather than variables.
const KNOWN_NAMES: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "sinh", "cosh", "tanh", "arcsin", "arccos",
    "arctan", "log", "ln", "exp", "sqrt", "sum", "int", "prod", "lim", "min", "max", "det",
    "mod", "gcd", "arg", "inf", "to", "in",
];

/// Greek letter names: kept whole during tokenisation, treated as variables.
const GREEK_NAMES: &[&str] = &[
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lambda", "mu", "nu", "xi", "pi", "rho", "sigma", "tau", "upsilon", "phi", "chi", "psi",
    "omega", "Gamma", "Delta", "Theta", "Lambda", "Xi", "Pi", "Sigma", "Phi", "Psi", "Omega",
];

/// Hook for an optional symbolic canonicalisation step applied after
/// textual normalisation. Implementations must be deterministic.
pub trait SymbolicCanonicalizer: Send + Sync {
    /// Return a canonical rewriting of `expr`, or `None` to keep it as is.
    fn canonicalize(&self, expr: &str) -> Option<String>;
}

/// Default canonicaliser: textual normalisation only.
#[derive(Debug, Default)]
pub struct NoCanonicalizer;

impl SymbolicCanonicalizer for NoCanonicalizer {
    fn canonicalize(&self, _expr: &str) -> Option<String> {
        None
    }
}

pub struct MathProcessor {
    kgram_width: usize,
    canonicalize: bool,
    canonicalizer: Box<dyn SymbolicCanonicalizer>,
    re_env: Regex,
    re_left_right: Regex,
    re_frac: Regex,
    re_sqrt: Regex,
    re_bounds: Regex,
    re_command: Regex,
    re_token: Regex,
    re_matrix_env: Regex,
    re_align_env: Regex,
}

impl MathProcessor {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self::with_canonicalizer(config, Box::new(NoCanonicalizer))
    }

    pub fn with_canonicalizer(
        config: &ProcessingConfig,
        canonicalizer: Box<dyn SymbolicCanonicalizer>,
    ) -> Self {
        Self {
            kgram_width: config.kgram_width(),
            canonicalize: config.symbolic_canonicalization_enabled(),
            canonicalizer,
            re_env: Regex::new(r"\\(?:begin|end)\{[a-zA-Z]+\*?\}")
                .expect("environment pattern is valid"),
            re_left_right: Regex::new(r"\\(?:left|right)\b")
                .expect("left/right pattern is valid"),
            re_frac: Regex::new(r"\\[dt]?frac\{([^{}]*)\}\{([^{}]*)\}")
                .expect("fraction pattern is valid"),
            re_sqrt: Regex::new(r"\\sqrt\{([^{}]*)\}").expect("sqrt pattern is valid"),
            re_bounds: Regex::new(r"\\(sum|int|prod|lim)_\{([^{}]*)\}(?:\^\{([^{}]*)\})?")
                .expect("bounds pattern is valid"),
            re_command: Regex::new(r"\\([a-zA-Z]+)").expect("command pattern is valid"),
            re_token: Regex::new(r"[A-Za-z]+|\d+(?:\.\d+)?|<=|>=|!=|[+\-*/=<>^(){}\[\],;:_|]")
                .expect("token pattern is valid"),
            re_matrix_env: Regex::new(r"\\begin\{[pbvB]?matrix\*?\}")
                .expect("matrix pattern is valid"),
            re_align_env: Regex::new(r"\\begin\{(?:align|aligned|eqnarray|gather|multline)\*?\}")
                .expect("align pattern is valid"),
        }
    }

    /// Full analysis of one mathematical span. Inputs that yield no tokens
    /// come back as [`MathematicalContent::unparsed`], never as an error.
    pub fn analyze(&self, raw_markup: &str) -> MathematicalContent {
        let mut normalized = self.normalize(raw_markup);
        if self.canonicalize {
            if let Some(canonical) = self.canonicalizer.canonicalize(&normalized) {
                normalized = canonical;
            }
        }
        let tokens = self.tokenize(&normalized);
        if tokens.is_empty() {
            return MathematicalContent::unparsed(raw_markup);
        }

        let mut variables = BTreeSet::new();
        let mut operators = BTreeSet::new();
        for token in &tokens {
            if token.chars().next().is_some_and(|c| c.is_alphabetic()) {
                if KNOWN_NAMES.contains(&token.as_str()) {
                    operators.insert(token.clone());
                } else {
                    variables.insert(token.clone());
                }
            } else if !token.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                operators.insert(token.clone());
            }
        }

        let k_grams = self.k_grams(&tokens);
        let complexity_score = self.complexity(raw_markup, &normalized, &tokens, &operators);
        let equation_type = self.equation_type(raw_markup, &tokens, &operators);

        MathematicalContent {
            raw_markup: raw_markup.to_string(),
            normalized_form: normalized,
            tokens,
            k_grams,
            variables,
            operators,
            complexity_score,
            equation_type,
        }
    }

    /// Rewrite markup into notation-invariant ASCII. Idempotent: the output
    /// contains no backslash commands, math delimiters, or Unicode operators
    /// for any rule to fire on again.
    pub fn normalize(&self, raw: &str) -> String {
        let mut s = self.re_env.replace_all(raw, " ").into_owned();

        // Math delimiters.
        s = s.replace("$$", " ").replace('$', " ");
        s = s
            .replace("\\[", " ")
            .replace("\\]", " ")
            .replace("\\(", " ")
            .replace("\\)", " ");
        s = self.re_left_right.replace_all(&s, "").into_owned();

        // Structured constructs, innermost first.
        while self.re_frac.is_match(&s) {
            s = self.re_frac.replace_all(&s, "($1)/($2)").into_owned();
        }
        while self.re_sqrt.is_match(&s) {
            s = self.re_sqrt.replace_all(&s, "sqrt($1)").into_owned();
        }
        s = self
            .re_bounds
            .replace_all(&s, |caps: &regex::Captures| {
                let op = &caps[1];
                let lower = caps[2].trim().to_string();
                match caps.get(3) {
                    Some(upper) => format!("{op}({lower} to {})", upper.as_str().trim()),
                    None => format!("{op}({lower})"),
                }
            })
            .into_owned();

        // Operator spellings.
        for (from, to) in [
            ("\\cdot", " * "),
            ("\\times", " * "),
            ("\\div", " / "),
            ("\\leq", " <= "),
            ("\\geq", " >= "),
            ("\\neq", " != "),
            ("\\pm", " +- "),
            ("\\infty", " inf "),
            // longest-match order: \int and \infty before \in
            ("\\int", " int "),
            ("\\in", " in "),
            ("\\\\", " ; "),
            ("×", " * "),
            ("·", " * "),
            ("÷", " / "),
            ("≤", " <= "),
            ("≥", " >= "),
            ("≠", " != "),
            ("∈", " in "),
            ("∞", " inf "),
            ("∑", " sum "),
            ("∫", " int "),
            ("√", " sqrt "),
        ] {
            s = s.replace(from, to);
        }

        // Remaining commands keep their name: \alpha -> alpha, \sum -> sum.
        s = self.re_command.replace_all(&s, "$1").into_owned();
        s = s.replace(['\\', '&', '{'], " ").replace('}', " ");
        // Brace grouping already served its purpose; drop the leftovers and
        // collapse whitespace so repeated normalisation is stable.
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Tokenise a normalised expression. Multi-letter identifiers that are
    /// not known function or Greek names split into single-letter variables,
    /// so `mc^2` yields `m`, `c`, `^`, `2`.
    pub fn tokenize(&self, normalized: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for m in self.re_token.find_iter(normalized) {
            let tok = m.as_str();
            let alphabetic = tok.chars().next().is_some_and(|c| c.is_alphabetic());
            if alphabetic
                && tok.len() > 1
                && !KNOWN_NAMES.contains(&tok)
                && !GREEK_NAMES.contains(&tok)
            {
                for c in tok.chars() {
                    tokens.push(c.to_string());
                }
            } else {
                tokens.push(tok.to_string());
            }
        }
        tokens
    }

    /// Space-joined windows of `kgram_width` consecutive tokens. Expressions
    /// shorter than the window produce a single gram of all tokens.
    pub fn k_grams(&self, tokens: &[String]) -> Vec<String> {
        if tokens.is_empty() {
            return Vec::new();
        }
        if tokens.len() < self.kgram_width {
            return vec![tokens.join(" ")];
        }
        tokens
            .windows(self.kgram_width)
            .map(|w| w.join(" "))
            .collect()
    }

    /// Weighted structural complexity, clamped to [0.0, 10.0].
    fn complexity(
        &self,
        raw: &str,
        normalized: &str,
        tokens: &[String],
        operators: &BTreeSet<String>,
    ) -> f64 {
        let matrices = self.re_matrix_env.find_iter(raw).count();
        let integrals = raw.matches("\\int").count() + raw.matches('∫').count();
        let sums = raw.matches("\\sum").count() + raw.matches('∑').count();
        let fractions = raw.matches("\\frac").count()
            + raw.matches("\\dfrac").count()
            + raw.matches("\\tfrac").count();

        let mut depth = 0usize;
        let mut max_depth = 0usize;
        for c in normalized.chars() {
            match c {
                '(' | '[' => {
                    depth += 1;
                    max_depth = max_depth.max(depth);
                }
                ')' | ']' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }

        let score = 1.2 * matrices as f64
            + 1.0 * integrals as f64
            + 0.9 * sums as f64
            + 0.8 * fractions as f64
            + 0.3 * max_depth as f64
            + 0.15 * tokens.len() as f64
            + 0.4 * operators.len() as f64;
        score.clamp(0.0, 10.0)
    }

    /// Dominant structural class, decided from the raw markup in priority
    /// order. Set membership requires an explicit `\in` or `∈`.
    fn equation_type(
        &self,
        raw: &str,
        tokens: &[String],
        operators: &BTreeSet<String>,
    ) -> EquationType {
        if self.re_matrix_env.is_match(raw) {
            return EquationType::Matrix;
        }
        if raw.contains("\\int") || raw.contains('∫') {
            return EquationType::Integral;
        }
        if raw.contains("\\sum") || raw.contains('∑') {
            return EquationType::Summation;
        }
        if raw.contains("\\frac") || raw.contains("\\dfrac") || raw.contains("\\tfrac") {
            return EquationType::Fraction;
        }
        if raw.contains("\\vec") || raw.contains("\\mathbf") || raw.contains("\\hat") {
            return EquationType::Vector;
        }
        if raw.contains("\\in ")
            || raw.contains("\\in}")
            || raw.ends_with("\\in")
            || raw.contains('∈')
        {
            return EquationType::SetMembership;
        }
        if self.re_align_env.is_match(raw) || (raw.contains("\\\\") && raw.contains('&')) {
            return EquationType::Aligned;
        }
        if raw.contains("$$")
            || raw.contains("\\[")
            || raw.contains("\\begin{equation")
        {
            return EquationType::Display;
        }
        let has_operator = operators
            .iter()
            .any(|op| !matches!(op.as_str(), "(" | ")"));
        if raw.contains('$') || (has_operator && tokens.len() >= 2) {
            return EquationType::Inline;
        }
        EquationType::Unknown
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
