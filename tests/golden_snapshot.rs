use std::fs;
use std::path::PathBuf;

use rfsnapshot::{snapshot, CloneOptions, Document};

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

#[tokio::test]
async fn golden_card_snapshot_matches_fixture() {
    let page = fs::read_to_string("tests/goldens/pages/card.html").expect("read fixture");
    let doc = Document::parse(&page);
    let root = doc.element_by_id("card").expect("fixture has a card");

    let snap = snapshot(&doc, root, &CloneOptions::default())
        .await
        .expect("snapshot");

    // Independent of the stored golden
    let again = snapshot(&doc, root, &CloneOptions::default())
        .await
        .expect("snapshot");
    assert_eq!(snap.digest(), again.digest());
    assert_eq!(snap.used_font_faces().count(), 2);
    assert!(!snap.to_html().contains("not part of the card"));

    let expected_path = golden_path("card.digest");
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all("tests/goldens/expected").ok();
        fs::write(&expected_path, snap.digest()).expect("write golden");
        fs::write(golden_path("card.html"), snap.to_html()).expect("write golden markup");
        println!("Updated golden: {:?}", expected_path);
        return;
    }

    if !expected_path.exists() {
        println!(
            "No golden at {:?}; run with UPDATE_GOLDENS=1 to create it. Skipping.",
            expected_path
        );
        return;
    }

    let expected = fs::read_to_string(&expected_path).expect("unable to read golden");
    assert_eq!(snap.digest(), expected.trim());
}
