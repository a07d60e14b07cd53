//! Parser for element-by-element bezier extraction data of a T-spline patch.
//!
//! The format is line oriented with whitespace separated tokens:
//!
//! ```text
//! <header, ignored>
//! <tag> ncp
//! <tag> nel
//! <tag> x y z w              ncp control point lines, see crate::control_mesh
//! ...
//! <tag> nshl ...             nel element blocks of nshl + 2 lines each:
//! n_0 n_1 ... n_{nshl-1}       global node indices
//! c_0 c_1 ... c_15             nshl rows of the extraction operator
//! ...
//! ```
//!
//! Row `r` of an element's extraction operator describes the basis function of node `n_r`
//! on that element as a combination of the 16 modes of [`crate::bernstein::tensor_product`].

use std::fs;
use std::path::Path;
use std::str::FromStr;

use nalgebra::dimension::{Const, Dynamic};
use nalgebra::{OMatrix, SVector};
use smallvec::SmallVec;

use crate::bernstein::BEZIER_MODES;
use crate::error::FormatError;

/// Line of the first control point, following the header and both counts
pub const CONTROL_POINT_OFFSET: usize = 3;

/// Coefficients of an element's basis functions in terms of the bicubic bernstein modes.
///
/// One row per basis function with support on the element, one column per mode.
pub type ExtractionOperator = OMatrix<f64, Dynamic, Const<BEZIER_MODES>>;

/// Global control point indices of an element's basis functions.
pub type ElementNodes = SmallVec<[usize; 16]>;

/// Pairs of global node index and basis function value.
pub type NodesAndEvals = SmallVec<[(usize, f64); 16]>;

/// Options controlling how strictly extraction data is validated.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseOptions {
    /// Reject operators whose rows don't sum to the bernstein partition of unity.
    pub check_partition_of_unity: bool,

    /// Absolute tolerance for the partition of unity check.
    pub partition_tolerance: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            check_partition_of_unity: true,
            partition_tolerance: 1e-8,
        }
    }
}

impl ParseOptions {
    /// Accept any finite extraction operator.
    pub fn lenient() -> Self {
        ParseOptions {
            check_partition_of_unity: false,
            ..ParseOptions::default()
        }
    }
}

/// A single bezier element: its extraction operator and the nodes its rows belong to.
#[derive(Clone, Debug, PartialEq)]
pub struct BezierElement {
    operator: ExtractionOperator,
    nodes: ElementNodes,
}

impl BezierElement {
    /// Creates an element, checking that there is one node per operator row.
    pub fn new(operator: ExtractionOperator, nodes: ElementNodes) -> Option<Self> {
        (operator.nrows() == nodes.len()).then(|| BezierElement { operator, nodes })
    }

    /// Number of basis functions with support on this element
    pub fn nshl(&self) -> usize {
        self.nodes.len()
    }

    /// The extraction operator
    pub fn operator(&self) -> &ExtractionOperator {
        &self.operator
    }

    /// Global node index of each operator row
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Values of the element's basis functions given the 16 bernstein mode values.
    ///
    /// Returns `(global node, value)` pairs in row order.
    pub fn basis_values(&self, bernstein: &SVector<f64, BEZIER_MODES>) -> NodesAndEvals {
        let values = &self.operator * bernstein;
        self.nodes.iter().copied().zip(values.iter().copied()).collect()
    }
}

/// A whole parsed extraction file.
#[derive(Clone, Debug, PartialEq)]
pub struct Patch {
    ncp: usize,
    elements: Vec<BezierElement>,
    max_nshl: usize,
}

impl Patch {
    /// Parses extraction data, validating it according to `options`.
    pub fn parse_with(text: &str, options: &ParseOptions) -> Result<Self, FormatError> {
        let mut cursor = LineCursor::new(text);
        cursor.next_line("header")?;
        let ncp = cursor.next_line("control point count")?.integer(1, "control point count")?;
        let nel = cursor.next_line("element count")?.integer(1, "element count")?;

        cursor.skip(ncp, "control points")?;

        // Every element occupies at least two lines.
        let mut elements = Vec::with_capacity(nel.min(cursor.remaining_len() / 2));
        let mut max_nshl = 0;
        for index in 0..nel {
            let element = parse_element(&mut cursor, ncp)?;
            if options.check_partition_of_unity {
                check_partition_of_unity(index, &element.operator, options.partition_tolerance)?;
            }
            log::trace!("element {}: {} basis functions", index, element.nshl());
            max_nshl = max_nshl.max(element.nshl());
            elements.push(element);
        }

        if let Some(line) = cursor.remaining().find(|line| !line.is_blank()) {
            log::debug!(
                "ignoring content after the last element, starting at line {}",
                line.number
            );
        }

        log::debug!(
            "parsed extraction data: {} control points, {} elements, \
             at most {} basis functions per element",
            ncp,
            nel,
            max_nshl
        );
        Ok(Patch { ncp, elements, max_nshl })
    }

    /// Reads and parses the extraction file at `path`.
    pub fn open(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Patch::parse_with(&text, options)
    }

    /// Number of control points
    pub fn ncp(&self) -> usize {
        self.ncp
    }

    /// Number of bezier elements
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Largest number of basis functions on a single element
    pub fn max_nshl(&self) -> usize {
        self.max_nshl
    }

    /// The element at `index`
    pub fn element(&self, index: usize) -> Option<&BezierElement> {
        self.elements.get(index)
    }

    /// All elements in file order
    pub fn elements(&self) -> &[BezierElement] {
        &self.elements
    }
}

impl FromStr for Patch {
    type Err = FormatError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Patch::parse_with(text, &ParseOptions::default())
    }
}

fn parse_element(cursor: &mut LineCursor<'_>, ncp: usize) -> Result<BezierElement, FormatError> {
    let nshl = cursor.next_line("element header")?.integer(1, "basis function count")?;

    let line = cursor.next_line("element nodes")?;
    line.expect_len(nshl)?;
    let mut nodes = ElementNodes::with_capacity(nshl);
    for i in 0..nshl {
        let node = line.integer(i, "node index")?;
        if node >= ncp {
            return Err(FormatError::NodeOutOfRange {
                line: line.number,
                node,
                ncp,
            });
        }
        nodes.push(node);
    }

    let mut coefficients = Vec::with_capacity(nshl * BEZIER_MODES);
    for _ in 0..nshl {
        let line = cursor.next_line("extraction operator row")?;
        line.expect_len(BEZIER_MODES)?;
        for k in 0..BEZIER_MODES {
            coefficients.push(line.real(k, "extraction coefficient")?);
        }
    }
    let operator = ExtractionOperator::from_row_slice_generic(
        Dynamic::new(nshl),
        Const::<BEZIER_MODES>,
        &coefficients,
    );

    Ok(BezierElement { operator, nodes })
}

/// Every bernstein mode has to be distributed completely among the element's basis functions.
fn check_partition_of_unity(
    element: usize,
    operator: &ExtractionOperator,
    tolerance: f64,
) -> Result<(), FormatError> {
    for (column, &sum) in operator.row_sum().iter().enumerate() {
        if (sum - 1.0).abs() > tolerance {
            return Err(FormatError::NotPartitionOfUnity { element, column, sum });
        }
    }
    Ok(())
}

/// Reads a text line by line, keeping track of the current line number.
pub(crate) struct LineCursor<'a> {
    lines: Vec<&'a str>,
    position: usize,
}

impl<'a> LineCursor<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        LineCursor {
            lines: text.lines().collect(),
            position: 0,
        }
    }

    /// Returns the next line and advances.
    pub(crate) fn next_line(&mut self, context: &'static str) -> Result<Line<'a>, FormatError> {
        let number = self.position;
        let text = self
            .lines
            .get(number)
            .copied()
            .ok_or(FormatError::MissingLine { line: number, context })?;
        self.position += 1;
        Ok(Line {
            number,
            tokens: text.split_whitespace().collect(),
        })
    }

    /// Advances by `count` lines, all of which must exist.
    pub(crate) fn skip(&mut self, count: usize, context: &'static str) -> Result<(), FormatError> {
        match self.position.checked_add(count) {
            Some(target) if target <= self.lines.len() => {
                self.position = target;
                Ok(())
            }
            _ => Err(FormatError::MissingLine {
                line: self.lines.len(),
                context,
            }),
        }
    }

    /// Number of lines after the current position
    pub(crate) fn remaining_len(&self) -> usize {
        self.lines.len() - self.position
    }

    /// All lines after the current position
    pub(crate) fn remaining(&self) -> impl Iterator<Item = Line<'a>> + '_ {
        self.lines[self.position..]
            .iter()
            .enumerate()
            .map(move |(i, &text)| Line {
                number: self.position + i,
                tokens: text.split_whitespace().collect(),
            })
    }
}

/// A tokenized line
pub(crate) struct Line<'a> {
    pub(crate) number: usize,
    tokens: SmallVec<[&'a str; 16]>,
}

impl<'a> Line<'a> {
    pub(crate) fn len(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.tokens.is_empty()
    }

    pub(crate) fn expect_len(&self, expected: usize) -> Result<(), FormatError> {
        if self.len() == expected {
            Ok(())
        } else {
            Err(FormatError::TokenCount {
                line: self.number,
                expected,
                found: self.len(),
            })
        }
    }

    pub(crate) fn token(
        &self,
        index: usize,
        context: &'static str,
    ) -> Result<&'a str, FormatError> {
        self.tokens.get(index).copied().ok_or(FormatError::MissingToken {
            line: self.number,
            token: index,
            context,
        })
    }

    pub(crate) fn integer(
        &self,
        index: usize,
        context: &'static str,
    ) -> Result<usize, FormatError> {
        let token = self.token(index, context)?;
        token.parse().map_err(|_| FormatError::InvalidInteger {
            line: self.number,
            value: token.to_owned(),
        })
    }

    /// Parses a finite real number
    pub(crate) fn real(&self, index: usize, context: &'static str) -> Result<f64, FormatError> {
        let token = self.token(index, context)?;
        token
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| FormatError::InvalidReal {
                line: self.number,
                value: token.to_owned(),
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fmt::Write;

    /// Writes an extraction file in which every element is a plain bezier patch
    /// with its own 16 nodes, i.e. all operators are the identity.
    pub(crate) fn disjoint_bezier_file(nel: usize) -> String {
        let ncp = 16 * nel;
        let mut text = String::new();
        writeln!(text, "type surface").unwrap();
        writeln!(text, "nodeN {}", ncp).unwrap();
        writeln!(text, "elemN {}", nel).unwrap();
        for i in 0..ncp {
            writeln!(text, "gi {} {} 0.0 1.0", i % 4, i / 4).unwrap();
        }
        for e in 0..nel {
            writeln!(text, "belem 16 3 3").unwrap();
            let nodes: Vec<String> = (0..16).map(|i| (16 * e + i).to_string()).collect();
            writeln!(text, "{}", nodes.join(" ")).unwrap();
            for r in 0..16 {
                let row: Vec<&str> = (0..16).map(|k| if k == r { "1.0" } else { "0.0" }).collect();
                writeln!(text, "{}", row.join(" ")).unwrap();
            }
        }
        text
    }

    /// A file with a single element whose 4 rows select the corner modes.
    pub(crate) const CORNER_MODES: &str = "\
type surface
nodeN 4
elemN 1
gi 0.0 0.0 0.0 1.0
gi 1.0 0.0 0.0 1.0
gi 0.0 1.0 0.0 1.0
gi 1.0 1.0 0.0 2.0
belem 4 3 3
0 1 2 3
1 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
0 0 0 1 0 0 0 0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0 0 0 0 1 0 0 0
0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 1
";

    #[test]
    fn parse_counts() {
        let patch = Patch::parse_with(CORNER_MODES, &ParseOptions::lenient()).unwrap();
        assert_eq!(patch.ncp(), 4);
        assert_eq!(patch.element_count(), 1);
        assert_eq!(patch.max_nshl(), 4);

        let element = patch.element(0).unwrap();
        assert_eq!(element.nodes(), &[0, 1, 2, 3]);
        assert_eq!(element.operator().nrows(), 4);
        assert_eq!(element.operator()[(1, 3)], 1.0);
        assert_eq!(element.operator()[(2, 12)], 1.0);
        assert_eq!(element.operator().sum(), 4.0);
    }

    #[test]
    fn parse_identity_elements() {
        let patch: Patch = disjoint_bezier_file(3).parse().unwrap();
        assert_eq!(patch.ncp(), 48);
        assert_eq!(patch.element_count(), 3);
        assert_eq!(patch.max_nshl(), 16);
        assert_eq!(patch.element(2).unwrap().nodes()[0], 32);
        assert!(patch.element(3).is_none());
    }

    #[test]
    fn parse_variable_block_lengths() {
        // Two elements with 1 and 2 basis functions, after two control points
        let text = "\
header
nodeN 3
elemN 2
gi 0 0 0 1
gi 0 0 0 1
gi 0 0 0 1
belem 1 3 3
2
1 1 1 1 1 1 1 1 1 1 1 1 1 1 1 1
belem 2 3 3
0 1
0.25 0.25 0.25 0.25 0.25 0.25 0.25 0.25 0.25 0.25 0.25 0.25 0.25 0.25 0.25 0.25
0.75 0.75 0.75 0.75 0.75 0.75 0.75 0.75 0.75 0.75 0.75 0.75 0.75 0.75 0.75 0.75
";
        let patch: Patch = text.parse().unwrap();
        assert_eq!(patch.element(0).unwrap().nodes(), &[2]);
        assert_eq!(patch.element(1).unwrap().nodes(), &[0, 1]);
        assert_eq!(patch.max_nshl(), 2);
    }

    #[test]
    fn reject_partition_violation() {
        match CORNER_MODES.parse::<Patch>() {
            Err(FormatError::NotPartitionOfUnity { element: 0, column: 1, sum }) => {
                assert_eq!(sum, 0.0)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn reject_truncated_file() {
        let text = disjoint_bezier_file(2);
        let keep = text.lines().count() - 3;
        let truncated = text.lines().take(keep).collect::<Vec<_>>().join("\n");
        assert!(matches!(
            truncated.parse::<Patch>(),
            Err(FormatError::MissingLine { context: "extraction operator row", .. })
        ));

        assert!(matches!(
            "header\nnodeN 10\nelemN 1\ngi 0 0 0 1\n".parse::<Patch>(),
            Err(FormatError::MissingLine { context: "control points", .. })
        ));
        assert!(matches!(
            "header\nnodeN".parse::<Patch>(),
            Err(FormatError::MissingToken { line: 1, token: 1, .. })
        ));
    }

    #[test]
    fn reject_oversized_counts() {
        assert!(matches!(
            "h\nnodeN 0\nelemN 99999999999999999\n".parse::<Patch>(),
            Err(FormatError::MissingLine { line: 3, context: "element header" })
        ));
        assert!(matches!(
            "h\nnodeN 18446744073709551615\nelemN 1\n".parse::<Patch>(),
            Err(FormatError::MissingLine { line: 3, context: "control points" })
        ));
        assert!(matches!(
            format!("h\nnodeN {}\nelemN 1\ngi 0 0 0 1\n", usize::MAX - 1).parse::<Patch>(),
            Err(FormatError::MissingLine { context: "control points", .. })
        ));
    }

    #[test]
    fn reject_malformed_tokens() {
        let text = CORNER_MODES.replace("nodeN 4", "nodeN four");
        assert!(matches!(
            Patch::parse_with(&text, &ParseOptions::lenient()),
            Err(FormatError::InvalidInteger { line: 1, .. })
        ));

        let text = CORNER_MODES.replace("0 0 0 1 0 0 0 0", "0 0 0 x 0 0 0 0");
        assert!(matches!(
            Patch::parse_with(&text, &ParseOptions::lenient()),
            Err(FormatError::InvalidReal { line: 10, .. })
        ));

        let text = CORNER_MODES.replace("0 0 0 1 0 0 0 0", "0 0 0 NaN 0 0 0 0");
        assert!(matches!(
            Patch::parse_with(&text, &ParseOptions::lenient()),
            Err(FormatError::InvalidReal { line: 10, .. })
        ));
    }

    #[test]
    fn reject_wrong_token_count() {
        let text = CORNER_MODES.replace("\n0 1 2 3\n", "\n0 1 2\n");
        assert!(matches!(
            Patch::parse_with(&text, &ParseOptions::lenient()),
            Err(FormatError::TokenCount { line: 8, expected: 4, found: 3 })
        ));

        let row = "1 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0";
        let text = CORNER_MODES.replace(row, &row[..row.len() - 2]);
        assert!(matches!(
            Patch::parse_with(&text, &ParseOptions::lenient()),
            Err(FormatError::TokenCount { line: 9, expected: 16, found: 15 })
        ));
    }

    #[test]
    fn reject_node_out_of_range() {
        let text = CORNER_MODES.replace("\n0 1 2 3\n", "\n0 1 2 4\n");
        assert!(matches!(
            Patch::parse_with(&text, &ParseOptions::lenient()),
            Err(FormatError::NodeOutOfRange { line: 8, node: 4, ncp: 4 })
        ));
    }

    #[test]
    fn trailing_content_is_ignored() {
        let text = format!("{}\n\nsome trailer\n", disjoint_bezier_file(1));
        let patch: Patch = text.parse().unwrap();
        assert_eq!(patch.element_count(), 1);
    }

    #[test]
    fn open_missing_file() {
        let path = std::env::temp_dir().join("tspline-extraction-does-not-exist.tsp");
        assert!(matches!(
            Patch::open(&path, &ParseOptions::default()),
            Err(FormatError::Io { .. })
        ));
    }

    #[test]
    fn element_needs_one_node_per_row() {
        let operator =
            ExtractionOperator::from_element_generic(Dynamic::new(2), Const::<BEZIER_MODES>, 0.5);
        let nodes: ElementNodes = [4, 7].into_iter().collect();
        let element = BezierElement::new(operator.clone(), nodes).unwrap();
        assert_eq!(element.nshl(), 2);
        assert!(BezierElement::new(operator, [4].into_iter().collect()).is_none());
    }

    #[test]
    fn basis_values_follow_rows() {
        let patch = Patch::parse_with(CORNER_MODES, &ParseOptions::lenient()).unwrap();
        let element = patch.element(0).unwrap();
        let bernstein = SVector::<f64, BEZIER_MODES>::from_fn(|k, _| k as f64);
        let values = element.basis_values(&bernstein);
        assert_eq!(values.as_slice(), &[(0, 0.0), (1, 3.0), (2, 12.0), (3, 15.0)]);
    }
}
