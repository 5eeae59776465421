use std::fmt::Write;

use bmm_core::{Batch, Element};

fn cell_width<T: Element>(values: &[T]) -> usize {
    values.iter().map(|v| v.to_string().len()).max().unwrap_or(1)
}

fn format_row<T: Element>(row: &[T], width: usize) -> String {
    let cells: Vec<String> = row.iter().map(|v| format!("{:>width$}", v, width = width)).collect();
    format!("[{}]", cells.join(" "))
}

/// Render a row-major `order` x `order` matrix, one bracketed row per line.
pub fn format_matrix<T: Element>(m: &[T], order: usize) -> String {
    if order == 0 {
        return String::new();
    }
    let width = cell_width(m);
    m.chunks(order)
        .map(|row| format_row(row, width))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render `A[i] x B[i] = C[i]` side by side for the first `limit` matrices
/// (all of them when `limit` is `None`).
///
/// The operator column sits on the middle row of each block.
pub fn render_triples<T: Element>(
    a: &Batch<T>,
    b: &Batch<T>,
    c: &Batch<T>,
    limit: Option<usize>,
) -> String {
    let order = a.order();
    let count = limit
        .unwrap_or(usize::MAX)
        .min(a.batch_size())
        .min(b.batch_size())
        .min(c.batch_size());
    let mut out = String::new();

    for i in 0..count {
        let (ma, mb, mc) = (a.matrix(i), b.matrix(i), c.matrix(i));
        let width = cell_width(ma).max(cell_width(mb)).max(cell_width(mc));
        let _ = writeln!(out, "matrix {}:", i);
        for r in 0..order {
            let span = r * order..(r + 1) * order;
            let (times, equals) = if r == order / 2 { ("x", "=") } else { (" ", " ") };
            let _ = writeln!(
                out,
                "  {} {} {} {} {}",
                format_row(&ma[span.clone()], width),
                times,
                format_row(&mb[span.clone()], width),
                equals,
                format_row(&mc[span], width),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_matrix() {
        let s = format_matrix(&[1, 20, 300, 4], 2);
        assert_eq!(s, "[  1  20]\n[300   4]");
    }

    #[test]
    fn test_format_matrix_negative() {
        assert_eq!(format_matrix(&[-5i64], 1), "[-5]");
    }

    #[test]
    fn test_render_triples() {
        let a = Batch::from_vec(vec![1, 2, 3, 4], 2, 1).unwrap();
        let b = Batch::from_vec(vec![5, 6, 7, 8], 2, 1).unwrap();
        let c = Batch::from_vec(vec![19, 22, 43, 50], 2, 1).unwrap();
        let s = render_triples(&a, &b, &c, None);
        let expected = "matrix 0:\n  [ 1  2]   [ 5  6]   [19 22]\n  [ 3  4] x [ 7  8] = [43 50]\n";
        assert_eq!(s, expected);
    }

    #[test]
    fn test_render_limit() {
        let a = Batch::from_vec(vec![1, 2, 3], 1, 3).unwrap();
        let s = render_triples(&a, &a, &a, Some(2));
        assert!(s.contains("matrix 1:"));
        assert!(!s.contains("matrix 2:"));
        assert_eq!(render_triples(&a, &a, &a, Some(0)), "");
    }
}
