#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use slotpage::{Page, PageId, PageKind};
use tempfile::TempDir;

const PAGE_SIZE: usize = 512;

fn write_pages(name: &str, pages: &[Vec<u8>]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(format!("{name}.pages"));
    fs::write(&path, pages.concat()).expect("write pages");
    (dir, path)
}

fn leaf_page() -> Vec<u8> {
    let mut buf = vec![0u8; PAGE_SIZE];
    let mut page = Page::init(&mut buf[..], PageId(1), PageKind::Leaf).expect("init leaf");
    page.insert_data(0, b"apple", b"red").expect("insert");
    page.insert_data(1, b"kiwi", b"green").expect("insert");
    page.insert_page_ref(2, b"melon", PageId(90)).expect("insert");
    buf
}

fn branch_page() -> Vec<u8> {
    let mut buf = vec![0u8; PAGE_SIZE];
    let mut page = Page::init(&mut buf[..], PageId(2), PageKind::Branch).expect("init branch");
    page.insert_page_ref(0, b"", PageId(10)).expect("insert");
    page.insert_page_ref(1, b"m", PageId(11)).expect("insert");
    buf
}

#[test]
fn prints_text_dump() {
    let (_dir, path) = write_pages("text", &[leaf_page()]);
    let output = cargo_bin_cmd!("page-inspect")
        .args(["--page-size", "512", "--hex"])
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8 output");
    assert!(text.starts_with("page #1 Leaf"));
    assert!(text.contains("key=\"kiwi\""));
    assert!(text.contains("-> #90"));
    assert!(text.contains("hex=6170706c65"));
}

#[test]
fn selects_page_by_index_as_json() {
    let (_dir, path) = write_pages("json", &[leaf_page(), branch_page()]);
    let output = cargo_bin_cmd!("page-inspect")
        .args(["--page-size", "512", "--index", "1", "--format", "json"])
        .arg(&path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["page"], 2);
    assert_eq!(json["kind"], "Branch");
    assert_eq!(json["entries"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["entries"][0]["key_hex"], "");
    assert_eq!(json["entries"][1]["page_ref"], 11);
}

#[test]
fn invalid_page_exits_with_code_two() {
    let mut buf = branch_page();
    {
        let mut page = Page::open(&mut buf[..]).expect("open");
        page.set_page_ref(1, PageId(10)).expect("set ref");
    }
    let (_dir, path) = write_pages("dup", &[buf]);
    cargo_bin_cmd!("page-inspect")
        .args(["--page-size", "512"])
        .arg(&path)
        .assert()
        .code(2);
    cargo_bin_cmd!("page-inspect")
        .args(["--page-size", "512", "--no-validate"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn corrupt_header_is_an_error() {
    let mut buf = leaf_page();
    buf[8] = 9;
    let (_dir, path) = write_pages("corrupt", &[buf]);
    cargo_bin_cmd!("page-inspect")
        .args(["--page-size", "512"])
        .arg(&path)
        .assert()
        .code(1);
}

#[test]
fn rejects_unsupported_page_size() {
    let (_dir, path) = write_pages("size", &[leaf_page()]);
    cargo_bin_cmd!("page-inspect")
        .args(["--page-size", "500"])
        .arg(&path)
        .assert()
        .failure();
}
