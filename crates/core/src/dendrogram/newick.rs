use std::fmt::Write;

use super::layout::DendrogramLayout;

enum Step {
    Visit { index: usize, parent_height: Option<f64> },
    Comma,
    Close { index: usize, parent_height: Option<f64> },
}

impl DendrogramLayout {
    /// Render the tree in Newick format.
    ///
    /// Branch lengths are the height differences between a node and its
    /// parent. Labels containing Newick punctuation or whitespace are
    /// single-quoted. The traversal is iterative, so deep single-linkage
    /// chains do not exhaust the stack.
    pub fn to_newick(&self) -> String {
        let n = self.n_leaves();
        if n == 0 {
            return ";".to_string();
        }

        let root = if self.linkage.is_empty() {
            0
        } else {
            n + self.linkage.len() - 1
        };

        let mut out = String::new();
        let mut stack = vec![Step::Visit {
            index: root,
            parent_height: None,
        }];

        while let Some(step) = stack.pop() {
            match step {
                Step::Visit {
                    index,
                    parent_height,
                } if index < n => {
                    out.push_str(&quote_label(&self.labels[index]));
                    push_length(&mut out, parent_height, 0.0);
                }
                Step::Visit {
                    index,
                    parent_height,
                } => {
                    let row = self.linkage[index - n];
                    out.push('(');
                    stack.push(Step::Close {
                        index,
                        parent_height,
                    });
                    stack.push(Step::Visit {
                        index: row.right,
                        parent_height: Some(row.distance),
                    });
                    stack.push(Step::Comma);
                    stack.push(Step::Visit {
                        index: row.left,
                        parent_height: Some(row.distance),
                    });
                }
                Step::Comma => out.push(','),
                Step::Close {
                    index,
                    parent_height,
                } => {
                    out.push(')');
                    push_length(&mut out, parent_height, self.node_height(index));
                }
            }
        }

        out.push(';');
        out
    }
}

fn push_length(out: &mut String, parent_height: Option<f64>, height: f64) {
    if let Some(parent) = parent_height {
        let _ = write!(out, ":{}", parent - height);
    }
}

fn quote_label(label: &str) -> String {
    let special = |c: char| c.is_whitespace() || "()[]':;,".contains(c);
    if label.contains(special) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}
