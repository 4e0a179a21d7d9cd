// Copyright the quorate authors.
// Licensed under the MIT and Apache-2.0 licenses.

//! The expression algebra that quorum systems are built from.
//!
//! An [Expr] is a monotone boolean formula over [Node] leaves: a tree of
//! And / Or / Choose combinators. A set of nodes _satisfies_ an expression
//! when substituting "present" for every member makes the formula true; the
//! satisfying sets are the expression's quorums. The algebra supports the
//! structural operations the planner needs: quorum enumeration, membership
//! tests, boolean duals, and resilience.
//!
//! Expressions are plain immutable values. The combinators flatten at
//! construction (`a + b + c` is one three-way Or, not a lopsided tree), so
//! displayed expressions read the way they were written.

use crate::lp::DenseProblem;
use crate::{Error, Node};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A set of nodes, e.g. one quorum. Ordered by node name.
pub type NodeSet = BTreeSet<Node>;

/// A monotone boolean expression over [Node] leaves.
///
/// `Choose { k, es }` is satisfied when at least `k` of its subexpressions
/// are; it is only ever constructed with `1 < k < es.len()`, since
/// [Expr::choose] normalizes the degenerate cases to [Expr::Or] and
/// [Expr::And].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Node(Node),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Choose { k: usize, es: Vec<Expr> },
}

impl From<Node> for Expr {
    fn from(n: Node) -> Expr {
        Expr::Node(n)
    }
}

impl From<&Node> for Expr {
    fn from(n: &Node) -> Expr {
        Expr::Node(n.clone())
    }
}

impl Expr {
    /// Disjunction: `self + rhs`. Adjacent Ors are flattened into one
    /// child list rather than nested.
    pub fn add(&self, rhs: &Expr) -> Expr {
        match (self, rhs) {
            (Expr::Or(xs), Expr::Or(ys)) => Expr::Or(xs.iter().chain(ys).cloned().collect()),
            (Expr::Or(xs), y) => {
                let mut es = xs.clone();
                es.push(y.clone());
                Expr::Or(es)
            }
            (x, Expr::Or(ys)) => {
                let mut es = vec![x.clone()];
                es.extend(ys.iter().cloned());
                Expr::Or(es)
            }
            (x, y) => Expr::Or(vec![x.clone(), y.clone()]),
        }
    }

    /// Conjunction: `self * rhs`, with the same flattening as [Expr::add].
    pub fn multiply(&self, rhs: &Expr) -> Expr {
        match (self, rhs) {
            (Expr::And(xs), Expr::And(ys)) => Expr::And(xs.iter().chain(ys).cloned().collect()),
            (Expr::And(xs), y) => {
                let mut es = xs.clone();
                es.push(y.clone());
                Expr::And(es)
            }
            (x, Expr::And(ys)) => {
                let mut es = vec![x.clone()];
                es.extend(ys.iter().cloned());
                Expr::And(es)
            }
            (x, y) => Expr::And(vec![x.clone(), y.clone()]),
        }
    }

    /// At-least-k-of: satisfied when at least `k` of `es` are satisfied.
    ///
    /// `choose(1, es)` is an Or and `choose(es.len(), es)` is an And, and
    /// both are normalized to those forms. `k` outside `[1, es.len()]` or an
    /// empty `es` is an error.
    pub fn choose(k: usize, es: Vec<Expr>) -> Result<Expr, Error> {
        if es.is_empty() {
            return Err(Error::EmptyChoose);
        }
        if k < 1 || k > es.len() {
            return Err(Error::ChooseOutOfRange { k, n: es.len() });
        }
        if k == 1 {
            return Ok(Expr::Or(es));
        }
        if k == es.len() {
            return Ok(Expr::And(es));
        }
        Ok(Expr::Choose { k, es })
    }

    /// The distinct nodes appearing as leaves.
    pub fn nodes(&self) -> NodeSet {
        let mut out = NodeSet::new();
        self.collect_nodes(&mut out);
        out
    }

    fn collect_nodes(&self, out: &mut NodeSet) {
        match self {
            Expr::Node(n) => {
                out.insert(n.clone());
            }
            Expr::And(es) | Expr::Or(es) | Expr::Choose { es, .. } => {
                for e in es {
                    e.collect_nodes(out);
                }
            }
        }
    }

    /// Leaf _occurrences_, duplicates counted: `(a + b) * a` has 3 leaves.
    pub fn num_leaves(&self) -> usize {
        match self {
            Expr::Node(_) => 1,
            Expr::And(es) | Expr::Or(es) | Expr::Choose { es, .. } => {
                es.iter().map(Expr::num_leaves).sum()
            }
        }
    }

    /// True when no node appears as a leaf more than once.
    pub fn dup_free(&self) -> bool {
        self.nodes().len() == self.num_leaves()
    }

    /// Enumerates satisfying node sets.
    ///
    /// The stream is lazy and restartable: each call builds a fresh
    /// iterator, and the cartesian products underneath And / Choose are
    /// walked with an odometer rather than materialized. The stream may
    /// contain duplicates and non-minimal sets when subexpressions share
    /// nodes; every yielded set satisfies the expression (and that is all
    /// callers may assume about it).
    pub fn quorums(&self) -> Box<dyn Iterator<Item = NodeSet> + '_> {
        match self {
            Expr::Node(n) => {
                let mut set = NodeSet::new();
                set.insert(n.clone());
                Box::new(std::iter::once(set))
            }
            Expr::Or(es) => Box::new(es.iter().flat_map(|e| e.quorums())),
            Expr::And(es) => {
                let lists: Vec<Vec<NodeSet>> = es.iter().map(|e| e.quorums().collect()).collect();
                Box::new(Product::new(lists).map(union_all))
            }
            Expr::Choose { k, es } => {
                Box::new(Combinations::new(es.len(), *k).flat_map(move |combo| {
                    let lists: Vec<Vec<NodeSet>> = combo
                        .iter()
                        .map(|&i| es[i].quorums().collect())
                        .collect();
                    Product::new(lists).map(union_all)
                }))
            }
        }
    }

    /// Whether `s` satisfies the expression. Membership is by node name.
    pub fn is_quorum(&self, s: &NodeSet) -> bool {
        match self {
            Expr::Node(n) => s.contains(n),
            Expr::Or(es) => es.iter().any(|e| e.is_quorum(s)),
            Expr::And(es) => es.iter().all(|e| e.is_quorum(s)),
            Expr::Choose { k, es } => es.iter().filter(|e| e.is_quorum(s)).count() >= *k,
        }
    }

    /// The boolean dual: And and Or swap, `choose(k of n)` becomes
    /// `choose(n - k + 1 of n)`, leaves are fixed.
    pub fn dual(&self) -> Expr {
        match self {
            Expr::Node(n) => Expr::Node(n.clone()),
            Expr::And(es) => Expr::Or(es.iter().map(Expr::dual).collect()),
            Expr::Or(es) => Expr::And(es.iter().map(Expr::dual).collect()),
            Expr::Choose { k, es } => Expr::Choose {
                k: es.len() - k + 1,
                es: es.iter().map(Expr::dual).collect(),
            },
        }
    }

    /// The minimum number of leaf failures that can wipe out every quorum,
    /// computed structurally. Exact for duplicate-free expressions; for
    /// expressions with repeated leaves the Or case over-counts (the same
    /// node is charged once per occurrence), which is why [Expr::resilience]
    /// falls back to a hitting-set computation there.
    pub fn min_failures(&self) -> usize {
        match self {
            Expr::Node(_) => 1,
            Expr::Or(es) => es.iter().map(Expr::min_failures).sum(),
            Expr::And(es) => es
                .iter()
                .map(Expr::min_failures)
                .min()
                .expect("and-expressions have at least one child"),
            Expr::Choose { k, es } => {
                let mut failures: Vec<usize> = es.iter().map(Expr::min_failures).collect();
                failures.sort_unstable();
                failures[..es.len() - k + 1].iter().sum()
            }
        }
    }

    /// The largest number of nodes that can fail while some quorum
    /// survives.
    ///
    /// Duplicate-free expressions use [Expr::min_failures] directly.
    /// Otherwise the realized quorums are enumerated and the minimum
    /// hitting set over them is computed by LP relaxation.
    pub fn resilience(&self) -> usize {
        if self.dup_free() {
            return self.min_failures() - 1;
        }
        let quorums: Vec<NodeSet> = self.quorums().collect();
        min_hitting_set(&quorums) - 1
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::add(&self, &rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::multiply(&self, &rhs)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, es: &[Expr], sep: &str) -> fmt::Result {
            for (i, e) in es.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{}", e)?;
            }
            Ok(())
        }
        match self {
            Expr::Node(n) => write!(f, "{}", n),
            Expr::Or(es) => {
                f.write_str("(")?;
                join(f, es, " + ")?;
                f.write_str(")")
            }
            Expr::And(es) => {
                f.write_str("(")?;
                join(f, es, " * ")?;
                f.write_str(")")
            }
            Expr::Choose { k, es } => {
                write!(f, "choose({}, ", k)?;
                join(f, es, ", ")?;
                f.write_str(")")
            }
        }
    }
}

fn union_all(sets: Vec<NodeSet>) -> NodeSet {
    let mut out = NodeSet::new();
    for s in sets {
        out.extend(s);
    }
    out
}

/// Renders a node set as `{a, b, c}` for error messages and display.
pub(crate) fn format_node_set(s: &NodeSet) -> String {
    let names: Vec<&str> = s.iter().map(|n| n.name.as_str()).collect();
    format!("{{{}}}", names.join(", "))
}

/// Smallest set of nodes intersecting every quorum in `quorums`, via the LP
/// relaxation of set cover: one `[0, 1]` variable per distinct node, an
/// all-ones objective, and one `>= 1` row per quorum. The relaxation's
/// optimum is rounded to the nearest integer.
pub(crate) fn min_hitting_set(quorums: &[NodeSet]) -> usize {
    let mut keys: Vec<&Node> = Vec::new();
    let mut seen: BTreeSet<&Node> = BTreeSet::new();
    for q in quorums {
        for n in q {
            if seen.insert(n) {
                keys.push(n);
            }
        }
    }

    let mut lp = DenseProblem::new();
    for _ in &keys {
        lp.add_var(1.0, 0.0, 1.0);
    }
    for q in quorums {
        let coefs = keys
            .iter()
            .map(|k| if q.contains(k) { 1.0 } else { 0.0 })
            .collect();
        lp.add_row(1.0, coefs, f64::INFINITY);
    }

    let solution = lp
        .minimize()
        .expect("hitting-set relaxation is always feasible");
    solution.iter().sum::<f64>().round() as usize
}

/// Odometer-style cartesian product over a list of lists. Yields one
/// `Vec<T>` per combination, rightmost list advancing fastest; nothing
/// beyond the input lists is materialized.
pub(crate) struct Product<T> {
    lists: Vec<Vec<T>>,
    idx: Vec<usize>,
    done: bool,
}

impl<T: Clone> Product<T> {
    pub(crate) fn new(lists: Vec<Vec<T>>) -> Product<T> {
        let done = lists.iter().any(|l| l.is_empty());
        Product {
            idx: vec![0; lists.len()],
            lists,
            done,
        }
    }
}

impl<T: Clone> Iterator for Product<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        if self.done {
            return None;
        }
        let item = self
            .idx
            .iter()
            .zip(&self.lists)
            .map(|(&i, l)| l[i].clone())
            .collect();
        let mut j = self.lists.len();
        loop {
            if j == 0 {
                self.done = true;
                break;
            }
            j -= 1;
            self.idx[j] += 1;
            if self.idx[j] < self.lists[j].len() {
                break;
            }
            self.idx[j] = 0;
        }
        Some(item)
    }
}

/// Lexicographic k-subsets of `0..n`, as index vectors.
pub(crate) struct Combinations {
    n: usize,
    k: usize,
    next: Option<Vec<usize>>,
}

impl Combinations {
    pub(crate) fn new(n: usize, k: usize) -> Combinations {
        let next = if k <= n { Some((0..k).collect()) } else { None };
        Combinations { n, k, next }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut succ = current.clone();
        let mut i = self.k;
        loop {
            if i == 0 {
                break;
            }
            i -= 1;
            // The largest value position i can hold and still leave room
            // for the k - i - 1 positions after it.
            if succ[i] < self.n - (self.k - i) {
                succ[i] += 1;
                for j in i + 1..self.k {
                    succ[j] = succ[j - 1] + 1;
                }
                self.next = Some(succ);
                break;
            }
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(name: &str) -> Expr {
        Expr::from(Node::new(name))
    }

    /// Renders each quorum as its sorted concatenated node names and
    /// compares the streams as multisets.
    fn assert_quorums(e: &Expr, expected: &[&[&str]]) {
        let mut actual: Vec<String> = e
            .quorums()
            .map(|q| q.iter().map(|n| n.name.clone()).collect::<Vec<_>>().join(""))
            .collect();
        let mut expected: Vec<String> = expected
            .iter()
            .map(|q| {
                let mut names: Vec<&str> = q.to_vec();
                names.sort_unstable();
                names.join("")
            })
            .collect();
        actual.sort();
        expected.sort();
        assert_eq!(actual, expected);
    }

    fn set(names: &[&str]) -> NodeSet {
        names.iter().map(|name| Node::new(*name)).collect()
    }

    #[test]
    fn display_and_flattening() {
        let (a, b, c) = (n("a"), n("b"), n("c"));
        assert_eq!(a.add(&b).add(&c).to_string(), "(a + b + c)");
        assert_eq!(a.multiply(&b).multiply(&c).to_string(), "(a * b * c)");
        assert_eq!(a.add(&b.multiply(&c)).to_string(), "(a + (b * c))");
        assert_eq!(
            (a.clone() + b.clone() + c.clone()).to_string(),
            "(a + b + c)"
        );
        assert_eq!((a.clone() * b.clone()).to_string(), "(a * b)");

        let choose = Expr::choose(2, vec![a, b, c]).unwrap();
        assert_eq!(choose.to_string(), "choose(2, a, b, c)");
    }

    #[test]
    fn choose_normalizes_and_validates() {
        let (a, b, c) = (n("a"), n("b"), n("c"));

        let or = Expr::choose(1, vec![a.clone(), b.clone(), c.clone()]).unwrap();
        assert!(matches!(or, Expr::Or(_)));

        let and = Expr::choose(3, vec![a.clone(), b.clone(), c.clone()]).unwrap();
        assert!(matches!(and, Expr::And(_)));

        assert_eq!(Expr::choose(2, vec![]), Err(Error::EmptyChoose));
        assert_eq!(
            Expr::choose(0, vec![a.clone(), b.clone()]),
            Err(Error::ChooseOutOfRange { k: 0, n: 2 })
        );
        assert_eq!(
            Expr::choose(4, vec![a, b, c]),
            Err(Error::ChooseOutOfRange { k: 4, n: 3 })
        );
    }

    #[test]
    fn quorum_enumeration() {
        let (a, b, c, d) = (n("a"), n("b"), n("c"), n("d"));

        assert_quorums(&a.multiply(&b).multiply(&c), &[&["a", "b", "c"]]);
        assert_quorums(&a.add(&b).add(&c), &[&["a"], &["b"], &["c"]]);
        // Nested And built by hand, without flattening.
        let nested = Expr::And(vec![Expr::And(vec![a.clone(), b.clone()]), c.clone()]);
        assert_quorums(&nested, &[&["a", "b", "c"]]);
        assert_quorums(&a.add(&b.multiply(&c)), &[&["a"], &["b", "c"]]);
        assert_quorums(&a.multiply(&a).multiply(&a), &[&["a"]]);
        assert_quorums(&a.multiply(&a.add(&b)), &[&["a"], &["a", "b"]]);
        assert_quorums(
            &a.add(&b).multiply(&a.add(&c)),
            &[&["a"], &["a", "c"], &["a", "b"], &["b", "c"]],
        );
        assert_quorums(
            &a.add(&b).multiply(&c.add(&d)),
            &[&["a", "c"], &["a", "d"], &["b", "c"], &["b", "d"]],
        );
    }

    #[test]
    fn quorum_enumeration_choose() {
        let (a, b, c) = (n("a"), n("b"), n("c"));

        let e = Expr::choose(1, vec![a.clone(), b.clone(), c.clone()]).unwrap();
        assert_quorums(&e, &[&["a"], &["b"], &["c"]]);

        let e = Expr::choose(2, vec![a.clone(), b.clone(), c.clone()]).unwrap();
        assert_quorums(&e, &[&["a", "b"], &["a", "c"], &["b", "c"]]);

        let e = Expr::choose(3, vec![a, b, c]).unwrap();
        assert_quorums(&e, &[&["a", "b", "c"]]);
    }

    #[test]
    fn quorum_enumeration_nested_choose() {
        let (a, b, c, d, e, f) = (n("a"), n("b"), n("c"), n("d"), n("e"), n("f"));

        let e1 = Expr::choose(2, vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let e2 = Expr::choose(2, vec![d.clone(), e.clone(), f.clone()]).unwrap();
        let e3 = Expr::choose(2, vec![a, c, e]).unwrap();
        let expr = Expr::choose(2, vec![e1, e2, e3]).unwrap();

        assert_quorums(
            &expr,
            &[
                &["a", "b", "d", "e"],
                &["a", "b", "d", "f"],
                &["a", "b", "e", "f"],
                &["a", "c", "d", "e"],
                &["a", "c", "d", "f"],
                &["a", "c", "e", "f"],
                &["b", "c", "d", "e"],
                &["b", "c", "d", "f"],
                &["b", "c", "e", "f"],
                &["a", "b", "c"],
                &["a", "b", "e"],
                &["a", "b", "c", "e"],
                &["a", "c"],
                &["a", "c", "e"],
                &["a", "c", "e"],
                &["b", "c", "a"],
                &["b", "c", "a", "e"],
                &["b", "c", "e"],
                &["d", "e", "a", "c"],
                &["d", "a", "e"],
                &["d", "e", "c"],
                &["d", "f", "a", "c"],
                &["d", "f", "a", "e"],
                &["d", "f", "c", "e"],
                &["e", "f", "a", "c"],
                &["e", "f", "a"],
                &["e", "f", "c"],
            ],
        );
    }

    #[test]
    fn quorums_are_restartable() {
        let (a, b, c) = (n("a"), n("b"), n("c"));
        let e = a.add(&b).multiply(&a.add(&c));
        let first: Vec<NodeSet> = e.quorums().collect();
        let second: Vec<NodeSet> = e.quorums().collect();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn every_enumerated_quorum_satisfies() {
        let (a, b, c, d) = (n("a"), n("b"), n("c"), n("d"));
        let exprs = [
            a.add(&b).multiply(&c.add(&d)),
            a.multiply(&a.add(&b)),
            Expr::choose(2, vec![a.clone(), b.clone(), c.clone(), d.clone()]).unwrap(),
            a.multiply(&b).add(&c.multiply(&d)),
        ];
        for e in &exprs {
            for q in e.quorums() {
                assert!(e.is_quorum(&q), "{} should satisfy {}", fmt_set(&q), e);
            }
        }
    }

    fn fmt_set(s: &NodeSet) -> String {
        s.iter().map(|n| n.name.as_str()).collect::<Vec<_>>().join(",")
    }

    #[test]
    fn membership() {
        let (a, b, c, d) = (n("a"), n("b"), n("c"), n("d"));

        let or = a.add(&b).add(&c);
        assert!(or.is_quorum(&set(&["a"])));
        assert!(or.is_quorum(&set(&["b"])));
        assert!(or.is_quorum(&set(&["a", "b"])));
        assert!(!or.is_quorum(&set(&[])));
        assert!(!or.is_quorum(&set(&["x"])));

        let choose = Expr::choose(2, vec![a.clone(), b.clone(), c.clone()]).unwrap();
        assert!(choose.is_quorum(&set(&["a", "b", "c"])));
        assert!(choose.is_quorum(&set(&["a", "b", "c", "x"])));
        assert!(choose.is_quorum(&set(&["a", "b"])));
        assert!(choose.is_quorum(&set(&["b", "c"])));
        assert!(!choose.is_quorum(&set(&[])));
        assert!(!choose.is_quorum(&set(&["a"])));
        assert!(!choose.is_quorum(&set(&["x"])));

        let and = a.multiply(&b).multiply(&c);
        assert!(and.is_quorum(&set(&["a", "b", "c"])));
        assert!(and.is_quorum(&set(&["a", "b", "c", "x"])));
        assert!(!and.is_quorum(&set(&["a", "b"])));
        assert!(!and.is_quorum(&set(&["a", "x"])));

        let grid = a.add(&b).multiply(&c.add(&d));
        assert!(grid.is_quorum(&set(&["a", "c"])));
        assert!(grid.is_quorum(&set(&["a", "d"])));
        assert!(grid.is_quorum(&set(&["b", "d"])));
        assert!(grid.is_quorum(&set(&["a", "b", "d"])));
        assert!(!grid.is_quorum(&set(&["a", "b"])));
        assert!(!grid.is_quorum(&set(&["c", "d"])));
        assert!(!grid.is_quorum(&set(&["x"])));
    }

    #[test]
    fn duals() {
        let (a, b, c, d, e) = (n("a"), n("b"), n("c"), n("d"), n("e"));

        assert_eq!(a.dual(), a);
        assert_eq!(a.add(&b).dual(), a.multiply(&b));
        assert_eq!(a.add(&a).dual(), a.multiply(&a));
        assert_eq!(
            a.add(&b).multiply(&c.add(&d)).dual(),
            a.multiply(&b).add(&c.multiply(&d))
        );
        assert_eq!(
            a.add(&a.multiply(&b)).add(&c.multiply(&d).add(&a)).dual(),
            a.multiply(&a.add(&b)).multiply(&c.add(&d).multiply(&a))
        );

        let sut = Expr::choose(2, vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let expected = Expr::choose(2, vec![a.clone(), b.clone(), c.clone()]).unwrap();
        assert_eq!(sut.dual(), expected);

        let sut = Expr::choose(2, vec![a.add(&b), c.add(&d), e.clone()]).unwrap();
        let expected =
            Expr::choose(2, vec![a.multiply(&b), c.multiply(&d), e.clone()]).unwrap();
        assert_eq!(sut.dual(), expected);

        let five = vec![a.clone(), b.clone(), c.clone(), d.clone(), e.clone()];
        let sut = Expr::choose(3, five.clone()).unwrap();
        assert_eq!(sut.dual(), Expr::choose(3, five.clone()).unwrap());

        let sut = Expr::choose(2, five.clone()).unwrap();
        assert_eq!(sut.dual(), Expr::choose(4, five.clone()).unwrap());

        let sut = Expr::choose(4, five.clone()).unwrap();
        assert_eq!(sut.dual(), Expr::choose(2, five).unwrap());
    }

    #[test]
    fn dual_is_semantically_involutive() {
        let (a, b, c, d) = (n("a"), n("b"), n("c"), n("d"));
        let exprs = [
            a.add(&b).multiply(&c.add(&d)),
            a.multiply(&a.add(&b)),
            Expr::choose(2, vec![a.clone(), b.clone(), c.clone()]).unwrap(),
            a.multiply(&b).add(&b.multiply(&c)).add(&a.multiply(&d)),
        ];
        for e in &exprs {
            let dd = e.dual().dual();
            let universe: Vec<Node> = e.nodes().into_iter().collect();
            // Same satisfying sets over every subset of the leaves.
            for mask in 0..(1 << universe.len()) {
                let subset: NodeSet = universe
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, n)| n.clone())
                    .collect();
                assert_eq!(e.is_quorum(&subset), dd.is_quorum(&subset));
            }
        }
    }

    #[test]
    fn dup_free() {
        let (a, b, c, d, e, f) = (n("a"), n("b"), n("c"), n("d"), n("e"), n("f"));

        assert!(a.dup_free());
        assert!(a.add(&b).dup_free());
        assert!(a.multiply(&b).dup_free());
        assert!(a.multiply(&b).add(&c).dup_free());
        assert!(a.add(&b).multiply(&c.add(&d.multiply(&e))).dup_free());
        assert!(!a.add(&a).dup_free());
        assert!(!a.multiply(&a).dup_free());
        assert!(!a.multiply(&b.add(&a)).dup_free());
        assert!(!a.add(&b).multiply(&c.add(&d.multiply(&a))).dup_free());

        let expr = Expr::choose(2, vec![a.clone(), b.clone(), c.clone()]).unwrap();
        assert!(expr.dup_free());
        let expr =
            Expr::choose(2, vec![a.multiply(&b), c.clone(), d.add(&e).add(&f)]).unwrap();
        assert!(expr.dup_free());
        let expr = Expr::choose(2, vec![a.clone(), b.clone(), a.clone()]).unwrap();
        assert!(!expr.dup_free());
        let expr = Expr::choose(3, vec![a.clone(), b, c, d, a.clone()]).unwrap();
        assert!(!expr.dup_free());
    }

    #[test]
    fn dup_free_law() {
        let (a, b, c) = (n("a"), n("b"), n("c"));
        let exprs = [
            a.clone(),
            a.add(&b),
            a.add(&a),
            a.multiply(&b.add(&a)),
            a.add(&b).multiply(&c.add(&a)),
        ];
        for e in &exprs {
            assert_eq!(e.dup_free(), e.nodes().len() == e.num_leaves());
        }
    }

    #[test]
    fn resilience() {
        let (a, b, c, d, e, f) = (n("a"), n("b"), n("c"), n("d"), n("e"), n("f"));

        let cases: Vec<(Expr, usize)> = vec![
            (a.clone(), 0),
            (a.add(&b), 1),
            (a.add(&b).add(&c), 2),
            (a.add(&b).add(&c).add(&d), 3),
            (a.multiply(&b), 0),
            (a.multiply(&b).multiply(&c), 0),
            (a.multiply(&b).multiply(&c).multiply(&d), 0),
            (a.add(&b).multiply(&c.add(&d)), 1),
            (a.add(&b).add(&c).multiply(&d.add(&e).add(&f)), 2),
            (a.add(&b).add(&c).multiply(&a.add(&e).add(&f)), 2),
            (a.add(&a).add(&c).multiply(&d.add(&e).add(&f)), 1),
            (a.add(&a).add(&a).multiply(&d.add(&e).add(&f)), 0),
            (
                a.multiply(&b)
                    .add(&b.multiply(&c))
                    .add(&a.multiply(&d))
                    .add(&a.multiply(&d).multiply(&e)),
                1,
            ),
        ];
        for (expr, expected) in &cases {
            assert_eq!(expr.resilience(), *expected, "resilience of {}", expr);
        }

        let choose_cases: Vec<(usize, Vec<Expr>, usize)> = vec![
            (2, vec![a.clone(), b.clone(), c.clone()], 1),
            (
                2,
                vec![a.clone(), b.clone(), c.clone(), d.clone(), e.clone()],
                3,
            ),
            (
                3,
                vec![a.clone(), b.clone(), c.clone(), d.clone(), e.clone()],
                2,
            ),
            (
                4,
                vec![a.clone(), b.clone(), c.clone(), d.clone(), e.clone()],
                1,
            ),
            (2, vec![a.add(&b).add(&c), d.add(&e), f.clone()], 2),
            (2, vec![a.multiply(&b), a.multiply(&c), d.clone()], 0),
            (2, vec![a.add(&b), a.add(&c), a.add(&d)], 2),
        ];
        for (k, es, expected) in choose_cases {
            let expr = Expr::choose(k, es).unwrap();
            assert_eq!(expr.resilience(), expected, "resilience of {}", expr);
        }
    }

    #[test]
    fn resilience_bounds() {
        let (a, b, c) = (n("a"), n("b"), n("c"));
        let exprs = [
            a.clone(),
            a.add(&b),
            a.multiply(&b.add(&a)),
            Expr::choose(2, vec![a.clone(), b, c]).unwrap(),
        ];
        for e in &exprs {
            assert!(e.resilience() <= e.nodes().len() - 1);
        }
    }

    #[test]
    fn combinations_enumerate_k_subsets() {
        let combos: Vec<Vec<usize>> = Combinations::new(4, 2).collect();
        assert_eq!(
            combos,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
            ]
        );
        assert_eq!(Combinations::new(3, 0).collect::<Vec<_>>(), vec![vec![]]);
        assert_eq!(Combinations::new(2, 3).count(), 0);
    }

    #[test]
    fn product_walks_the_odometer() {
        let prod: Vec<Vec<u8>> = Product::new(vec![vec![1, 2], vec![3], vec![4, 5]]).collect();
        assert_eq!(
            prod,
            vec![
                vec![1, 3, 4],
                vec![1, 3, 5],
                vec![2, 3, 4],
                vec![2, 3, 5],
            ]
        );
        assert_eq!(Product::<u8>::new(vec![vec![], vec![1]]).count(), 0);
    }
}
