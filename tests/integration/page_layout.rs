#![allow(missing_docs)]

use slotpage::size::{self, SizeRequest};
use slotpage::{
    ErrorCategory, InsertValue, NodeKind, Page, PageError, PageId, PageKind, PageOptions, Result,
    DEFAULT_PAGE_SIZE, NODE_HEADER_LEN, PAGE_HEADER_LEN,
};

#[test]
fn records_are_laid_out_little_endian_from_the_end() -> Result<()> {
    let mut buf = vec![0u8; 256];
    {
        let mut page = Page::init(&mut buf[..], PageId(0x0102), PageKind::Leaf)?;
        page.insert_data(0, b"ab", b"xyz")?;
    }
    // 11 + 2 + 3 = 16 bytes, already even.
    let offset = 256 - 16;
    assert_eq!(&buf[0..8], &0x0102u64.to_le_bytes());
    assert_eq!(buf[8], 1);
    assert_eq!(&buf[9..11], &19u16.to_le_bytes());
    assert_eq!(&buf[11..13], &(offset as u16).to_le_bytes());
    assert_eq!(&buf[17..19], &(offset as u16).to_le_bytes());

    let rec = &buf[offset..];
    assert_eq!(&rec[0..2], &2u16.to_le_bytes());
    assert_eq!(rec[2], NodeKind::Data.as_u8());
    assert_eq!(&rec[3..7], &3i32.to_le_bytes());
    assert_eq!(&rec[NODE_HEADER_LEN..NODE_HEADER_LEN + 2], b"ab");
    assert_eq!(&rec[NODE_HEADER_LEN + 2..NODE_HEADER_LEN + 5], b"xyz");
    Ok(())
}

#[test]
fn accounting_tracks_every_insert() -> Result<()> {
    let mut buf = vec![0u8; DEFAULT_PAGE_SIZE];
    let mut page = Page::init(&mut buf[..], PageId(3), PageKind::Leaf)?;
    let mut expected_used = 0;
    for i in 0..40u32 {
        let key = format!("key{i:04}");
        let value = vec![b'v'; (i % 13) as usize];
        let required = page.required_space(key.as_bytes(), SizeRequest::Data(value.len()));
        assert!(page.has_space_for(key.as_bytes(), SizeRequest::Data(value.len())));
        page.insert_data(i as usize, key.as_bytes(), &value)?;
        expected_used += required;
        assert_eq!(page.size_used(), expected_used);
        assert_eq!(page.size_left() + page.size_used(), page.max_space());
        assert_eq!(page.calc_size_used()?, page.size_used());
        assert_eq!(page.calc_size_left()?, page.size_left());
    }
    assert!(page.uses_more_than(expected_used - 1));
    assert!(!page.uses_more_than(expected_used));
    Ok(())
}

#[test]
fn size_requests_charge_overflow_heads_as_references() {
    let node_max = size::node_max_size(DEFAULT_PAGE_SIZE);
    assert_eq!(node_max, 2036);
    let inline = size::node_entry(node_max, 8, SizeRequest::Data(100));
    assert_eq!(inline, 120);
    let redirected = size::node_entry(node_max, 8, SizeRequest::Data(5000));
    assert_eq!(redirected, size::node_entry(node_max, 8, SizeRequest::PageRef));
    assert_eq!(redirected, 20);
    assert_eq!(size::overflow_pages(DEFAULT_PAGE_SIZE, 5000), 2);
    assert_eq!(size::overflow_pages(DEFAULT_PAGE_SIZE, 4096 - PAGE_HEADER_LEN), 1);
}

#[test]
fn oversized_values_are_refused_before_writing() -> Result<()> {
    let mut buf = vec![0u8; DEFAULT_PAGE_SIZE];
    let mut page = Page::init(&mut buf[..], PageId(4), PageKind::Leaf)?;
    let before = page.as_bytes().to_vec();
    let err = page.insert(0, b"big", InsertValue::Data(4000)).unwrap_err();
    assert!(matches!(err, PageError::ValueTooLarge { len: 4000, .. }));
    assert_eq!(err.category(), ErrorCategory::Invariant);
    assert_eq!(page.as_bytes(), &before[..]);

    // The tree layer stores the head of an overflow chain instead.
    page.insert(0, b"big", InsertValue::PageRef(PageId(77)))?;
    assert_eq!(page.node(0)?.page_ref(), Some(PageId(77)));
    Ok(())
}

#[test]
fn overflow_chain_head_holds_raw_bytes() -> Result<()> {
    let value: Vec<u8> = (0..6000u32).map(|i| (i % 251) as u8).collect();
    let pages = size::overflow_pages(1024, value.len());
    let mut image = vec![0u8; pages * 1024];
    {
        let mut head = Page::init_overflow(&mut image[..1024], PageId(50), value.len())?;
        let first = head.overflow_data_mut().len();
        head.overflow_data_mut().copy_from_slice(&value[..first]);
        let rest = &value[first..];
        image[1024..1024 + rest.len()].copy_from_slice(rest);
    }
    let head = Page::open(&image[..1024])?;
    assert!(head.is_overflow());
    assert_eq!(head.overflow_size(), value.len());
    let mut restored = head.overflow_data().to_vec();
    restored.extend_from_slice(&image[1024..1024 + value.len() - restored.len()]);
    assert_eq!(restored, value);
    Ok(())
}

#[test]
fn corrupt_images_are_reported() -> Result<()> {
    let mut buf = vec![0u8; 512];
    {
        let mut page = Page::init(&mut buf[..], PageId(5), PageKind::Leaf)?;
        page.insert_data(0, b"k", b"v")?;
    }

    let mut bad = buf.clone();
    bad[11..13].copy_from_slice(&600u16.to_le_bytes());
    let err = Page::open(&bad[..]).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Corruption);

    // A slot pointing into free space cannot be decoded.
    let mut bad = buf.clone();
    bad[17..19].copy_from_slice(&100u16.to_le_bytes());
    let page = Page::open(&bad[..])?;
    assert!(matches!(page.node(0), Err(PageError::Corruption(_))));
    Ok(())
}

#[test]
fn options_reject_foreign_buffers() -> Result<()> {
    let options = PageOptions::new().page_size(2048);
    let mut buf = vec![0u8; 4096];
    let err = Page::init_with(&mut buf[..], PageId(1), PageKind::Leaf, &options).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Invalid);

    let mut buf = vec![0u8; 2048];
    let page = Page::init_with(&mut buf[..], PageId(1), PageKind::Branch, &options)?;
    assert_eq!(page.max_space(), options.max_space());
    assert_eq!(page.node_max_size(), options.node_max_size());
    assert_eq!(page.to_string(), "#1 (count: 0) Branch");
    Ok(())
}
