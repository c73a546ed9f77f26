#![allow(missing_docs)]

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use slotpage::size;
use slotpage::{
    Lexicographic, Page, PageId, PageKind, PageOptions, Result, ScratchPool, PAGE_HEADER_LEN,
};

fn random_leaf(buf: &mut [u8], rng: &mut ChaCha8Rng, count: usize) -> Result<Vec<Vec<u8>>> {
    let mut page = Page::init(buf, PageId(20), PageKind::Leaf)?;
    let mut keys: Vec<Vec<u8>> = (0..count).map(|i| format!("{i:06}").into_bytes()).collect();
    keys.shuffle(rng);
    for key in &keys {
        let value = vec![key[5]; rng.gen_range(0..40)];
        let position = page.node_position_for(key[..].into(), &Lexicographic)?;
        page.insert_data(position, key, &value)?;
    }
    keys.sort();
    Ok(keys)
}

#[test]
fn truncate_after_churn_defragments() -> Result<()> {
    let options = PageOptions::new().page_size(2048).scratch_pages(1);
    let scratch = ScratchPool::from_options(&options)?;
    let mut rng = ChaCha8Rng::seed_from_u64(0x7A11_0042);
    let mut buf = vec![0u8; options.page_size];
    let keys = random_leaf(&mut buf, &mut rng, 30)?;

    let mut page = Page::open(&mut buf[..])?;
    // Remove every third entry so the record region has holes.
    let mut idx = 0;
    let mut survivors = Vec::new();
    for (n, key) in keys.iter().enumerate() {
        if n % 3 == 0 {
            page.remove(idx)?;
        } else {
            survivors.push(key.clone());
            idx += 1;
        }
    }
    assert_eq!(page.keys()?, survivors);

    let keep = survivors.len() / 2;
    let before: Vec<(Vec<u8>, Vec<u8>)> = page
        .nodes()
        .take(keep)
        .map(|node| node.map(|n| (n.key().to_vec(), n.data().unwrap_or_default().to_vec())))
        .collect::<Result<_>>()?;
    page.truncate(keep, &scratch)?;
    let after: Vec<(Vec<u8>, Vec<u8>)> = page
        .nodes()
        .map(|node| node.map(|n| (n.key().to_vec(), n.data().unwrap_or_default().to_vec())))
        .collect::<Result<_>>()?;
    assert_eq!(after, before);

    // Records are packed against the page end with no gaps.
    let packed = page
        .nodes()
        .map(|node| node.map(|n| size::node_entry_of(&n)))
        .sum::<Result<usize>>()?;
    assert_eq!(options.page_size - page.upper() as usize, packed);
    assert_eq!(page.lower() as usize, PAGE_HEADER_LEN + keep * 2);
    page.validate(&Lexicographic)?;
    Ok(())
}

#[test]
fn truncate_is_idempotent_and_reuses_scratch() -> Result<()> {
    let scratch = ScratchPool::new(1024, 1)?;
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut buf = vec![0u8; 1024];
    random_leaf(&mut buf, &mut rng, 12)?;

    let mut page = Page::open(&mut buf[..])?;
    page.truncate(5, &scratch)?;
    assert_eq!(scratch.cached(), 1);
    let once = page.as_bytes().to_vec();
    page.truncate(5, &scratch)?;
    assert_eq!(page.as_bytes(), &once[..]);
    assert_eq!(page.number_of_entries(), 5);

    page.truncate(0, &scratch)?;
    assert_eq!(page.number_of_entries(), 0);
    assert_eq!(page.size_left(), page.max_space());
    assert_eq!(scratch.cached(), 1);
    Ok(())
}

#[test]
fn compact_keeps_every_entry() -> Result<()> {
    let scratch = ScratchPool::new(1024, 2)?;
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut buf = vec![0u8; 1024];
    let keys = random_leaf(&mut buf, &mut rng, 15)?;
    let mut page = Page::open(&mut buf[..])?;
    page.remove(3)?;
    page.remove(7)?;
    let expected = page.keys()?;
    let left = page.size_left();
    page.compact(&scratch)?;
    assert_eq!(page.keys()?, expected);
    assert_eq!(page.size_left(), left);
    assert_eq!(page.number_of_entries(), keys.len() - 2);
    Ok(())
}
