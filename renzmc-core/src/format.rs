use std::fmt::Write;

use crate::error::{Diagnostic, ErrorKind};

const CONTEXT_LINES: usize = 2;
const MAX_TILDES: usize = 10;

/// Renders a diagnostic for humans. `source` is used when the diagnostic does
/// not carry its own source text.
pub fn format_error(diag: &Diagnostic, source: Option<&str>) -> String {
    if diag.kind == ErrorKind::Interrupted {
        return String::from("✓ Program dihentikan oleh pengguna (Ctrl+C)");
    }

    let (line, column) = match (diag.line, diag.column) {
        (Some(line), Some(column)) => (line, column),
        _ => return format_unlocated(diag),
    };

    let mut out = String::new();
    let _ = writeln!(out, "🚫 Error {}: {}", diag.kind, diag.message);
    let _ = writeln!(out, "📍 Pada baris {}, kolom {}", line, column);

    let code = diag
        .source_code
        .as_deref()
        .filter(|code| !code.is_empty())
        .or(source);
    if let Some(code) = code {
        excerpt(&mut out, code, line, column);
    }

    out.push_str("\n💡 Saran perbaikan:\n");
    for tip in tips(diag.kind) {
        let _ = writeln!(out, "- {}", tip);
    }
    out
}

fn format_unlocated(diag: &Diagnostic) -> String {
    let mut out = format!("🚫 Error {}: {}\n", diag.kind, diag.message);
    let message = diag.message.to_lowercase();

    let tip = if message.contains("tidak ditemukan") || message.contains("tidak terdefinisi") {
        Some("Pastikan variabel atau fungsi sudah dideklarasikan sebelum digunakan")
    } else if message.contains("tidak dapat dipanggil") {
        Some("Pastikan objek yang dipanggil adalah fungsi atau metode")
    } else if message.contains("rekursi") {
        Some("Periksa kondisi berhenti pada fungsi rekursif Anda")
    } else {
        None
    };

    if let Some(tip) = tip {
        let _ = write!(out, "\n💡 Tips: {}", tip);
    }
    out
}

fn excerpt(out: &mut String, code: &str, line: usize, column: usize) {
    let lines: Vec<&str> = code.split('\n').collect();
    if line == 0 || line > lines.len() {
        return;
    }

    let index = line - 1;
    let text = lines[index];
    let _ = writeln!(out, "\n{} | {}", line, text);

    let width = text.chars().count();
    let indent = line.to_string().len() + 3 + column.saturating_sub(1);
    let mut pointer = " ".repeat(indent);
    pointer.push('^');
    if column + MAX_TILDES < width {
        pointer.push_str(&"~".repeat((width - column).min(MAX_TILDES)));
    }
    let _ = writeln!(out, "{}", pointer);

    let start = index.saturating_sub(CONTEXT_LINES);
    let end = lines.len().min(index + CONTEXT_LINES + 1);
    if start > 0 {
        out.push_str("...\n");
    }
    for (i, context) in lines.iter().enumerate().take(end).skip(start) {
        if i == index {
            continue;
        }
        let _ = writeln!(out, "{} | {}", i + 1, context);
    }
    if end < lines.len() {
        out.push_str("...\n");
    }
}

fn tips(kind: ErrorKind) -> [&'static str; 2] {
    match kind {
        ErrorKind::Lexer => [
            "Periksa karakter yang tidak valid atau tidak dikenali",
            "Pastikan string dan komentar ditutup dengan benar",
        ],
        ErrorKind::Parser => [
            "Periksa sintaks dan tanda baca (kurung, koma, titik koma)",
            "Pastikan semua blok kode ditutup dengan benar",
        ],
        ErrorKind::Name => [
            "Pastikan variabel sudah dideklarasikan sebelum digunakan",
            "Periksa ejaan nama variabel (huruf besar/kecil)",
        ],
        ErrorKind::Type => [
            "Pastikan tipe data yang digunakan sesuai dengan operasi",
            "Periksa konversi tipe data jika diperlukan",
        ],
        ErrorKind::Value => [
            "Periksa nilai yang dimasukkan sesuai dengan yang diharapkan",
            "Pastikan format nilai sudah benar",
        ],
        ErrorKind::Import => [
            "Pastikan modul yang diimpor tersedia dan dieja dengan benar",
            "Periksa jalur impor dan dependensi",
        ],
        ErrorKind::Attribute => [
            "Pastikan objek memiliki atribut atau metode yang dipanggil",
            "Periksa ejaan nama atribut/metode",
        ],
        ErrorKind::Index => [
            "Pastikan indeks berada dalam rentang yang valid",
            "Periksa panjang daftar atau string sebelum mengakses indeks",
        ],
        ErrorKind::Key => [
            "Pastikan kunci ada dalam kamus sebelum diakses",
            "Gunakan metode .get() untuk menghindari error jika kunci tidak ada",
        ],
        ErrorKind::DivisionByZero => [
            "Hindari pembagian dengan nol",
            "Tambahkan pemeriksaan untuk nilai nol sebelum melakukan pembagian",
        ],
        ErrorKind::File => [
            "Pastikan file ada dan dapat diakses",
            "Periksa izin file dan jalur yang benar",
        ],
        ErrorKind::TypeHint => [
            "Pastikan nilai sesuai dengan tipe data yang ditentukan",
            "Periksa deklarasi tipe dan konversi nilai jika diperlukan",
        ],
        ErrorKind::Syntax => [
            "Periksa sintaks kode untuk kesalahan",
            "Pastikan semua tanda kurung, koma, dan titik koma berada di tempat yang benar",
        ],
        _ => [
            "Periksa kembali kode Anda untuk kesalahan",
            "Pastikan semua nilai dan operasi sesuai dengan yang diharapkan",
        ],
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{Diagnostic, ErrorKind};
    use crate::format::format_error;

    #[test]
    fn test_interrupt_is_a_single_notice() {
        assert_eq!(
            format_error(&Diagnostic::interrupted(), Some("x itu 1")),
            "✓ Program dihentikan oleh pengguna (Ctrl+C)"
        );
    }

    #[test]
    fn test_unlocated_gets_heuristic_tip() {
        let diag = Diagnostic::new(ErrorKind::Name, "Variabel 'y' tidak terdefinisi");
        assert_eq!(
            format_error(&diag, None),
            "🚫 Error Name: Variabel 'y' tidak terdefinisi\n\n💡 Tips: Pastikan variabel atau fungsi sudah dideklarasikan sebelum digunakan"
        );

        let plain = Diagnostic::new(ErrorKind::Value, "nilai buruk");
        assert_eq!(format_error(&plain, None), "🚫 Error Value: nilai buruk\n");
    }

    #[test]
    fn test_located_excerpt_with_context() {
        let source = "a itu 1\nb itu 2\nc itu 3\nd itu 4 / 0 + nilai_panjang_sekali\ne itu 5\nf itu 6\ng itu 7";
        let diag = Diagnostic::at(ErrorKind::DivisionByZero, "Pembagian dengan nol", 4, 7);

        let expected = concat!(
            "🚫 Error DivisionByZero: Pembagian dengan nol\n",
            "📍 Pada baris 4, kolom 7\n",
            "\n",
            "4 | d itu 4 / 0 + nilai_panjang_sekali\n",
            "          ^~~~~~~~~~~\n",
            "...\n",
            "2 | b itu 2\n",
            "3 | c itu 3\n",
            "5 | e itu 5\n",
            "6 | f itu 6\n",
            "...\n",
            "\n",
            "💡 Saran perbaikan:\n",
            "- Hindari pembagian dengan nol\n",
            "- Tambahkan pemeriksaan untuk nilai nol sebelum melakukan pembagian\n",
        );

        assert_eq!(format_error(&diag, Some(source)), expected);
    }

    #[test]
    fn test_short_line_has_no_tildes_and_own_source_wins() {
        let diag = Diagnostic::at(ErrorKind::Lexer, "Karakter tidak dikenal '$'", 1, 3)
            .with_source("a $ b");
        let text = format_error(&diag, Some("bukan ini"));

        assert!(text.contains("\n1 | a $ b\n      ^\n"));
        assert!(text.contains("- Pastikan string dan komentar ditutup dengan benar\n"));
        assert!(!text.contains("..."));
    }

    #[test]
    fn test_unknown_kind_gets_generic_tip() {
        let diag = Diagnostic::at(ErrorKind::Async, "Coroutine sudah ditunggu", 1, 1);
        let text = format_error(&diag, None);
        assert!(text.starts_with("🚫 Error Async: Coroutine sudah ditunggu\n📍 Pada baris 1, kolom 1\n"));
        assert!(text.ends_with("- Periksa kembali kode Anda untuk kesalahan\n- Pastikan semua nilai dan operasi sesuai dengan yang diharapkan\n"));
    }
}
