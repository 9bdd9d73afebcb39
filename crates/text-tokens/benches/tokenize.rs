use text_tokens::html::HtmlTagTokenizer;
use text_tokens::{TokenStream, WordTokenizer};

fn main() {
    divan::main();
}

fn synthetic_document() -> String {
    let mut out = String::new();
    for section in 0..200 {
        out.push_str(&format!("<h2 id=\"s{section}\">Section {section}</h2>\n"));
        for paragraph in 0..10 {
            out.push_str(&format!(
                "<p class=\"body\">paragraph {paragraph} with some, punctuated; text and \
                 <a href=\"#s{section}\">a link</a> in the middle.</p>\n"
            ));
        }
    }
    out
}

#[divan::bench]
fn bench_word_tokenizer(bencher: divan::Bencher) {
    let input = synthetic_document();

    bencher.bench(|| {
        let mut words = WordTokenizer::new(input.clone());
        while words.next_token().is_ok() {}
    });
}

#[divan::bench]
fn bench_html_tag_tokenizer(bencher: divan::Bencher) {
    let input = synthetic_document();

    bencher.bench(|| {
        let mut tags = HtmlTagTokenizer::new(input.clone(), ["p"]);
        while tags.next_token().is_ok() {}
    });
}
