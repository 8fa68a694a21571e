// SPDX-License-Identifier: PMPL-1.0-or-later
//
// End-to-end pipeline runs against generated image trees, with and
// without METS metadata.

use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};

use blattwerk_core::config::{RunConfig, StepConfig};
use blattwerk_core::plan::StepKind;
use blattwerk_document::image::processor::ImageProcessor;
use blattwerk_mets::MetadataStore;
use blattwerk_pipeline::Derivans;

const METS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:mods="http://www.loc.gov/mods/v3" xmlns:xlink="http://www.w3.org/1999/xlink">
  <mets:dmdSec ID="md737429">
    <mets:mdWrap MDTYPE="MODS">
      <mets:xmlData>
        <mods:mods>
          <mods:titleInfo>
            <mods:title>Ode In Solemni Panegyri Avgvstissimo Ac Potentissimo</mods:title>
          </mods:titleInfo>
          <mods:name type="personal">
            <mods:role>
              <mods:roleTerm type="code">aut</mods:roleTerm>
            </mods:role>
            <mods:displayForm>Brühl</mods:displayForm>
          </mods:name>
          <mods:originInfo eventType="publication">
            <mods:dateIssued>1731</mods:dateIssued>
          </mods:originInfo>
          <mods:identifier type="urn">urn:nbn:de:gbv:3:3-21437</mods:identifier>
          <mods:recordInfo>
            <mods:recordIdentifier source="gbv">191092622</mods:recordIdentifier>
          </mods:recordInfo>
        </mods:mods>
      </mets:xmlData>
    </mets:mdWrap>
  </mets:dmdSec>
  <mets:fileSec>
    <mets:fileGrp USE="MAX">
      <mets:file ID="MAX_737434"><mets:FLocat LOCTYPE="URL" xlink:href="MAX/737434.jpg"/></mets:file>
      <mets:file ID="MAX_737436"><mets:FLocat LOCTYPE="URL" xlink:href="MAX/737436.jpg"/></mets:file>
      <mets:file ID="MAX_737437"><mets:FLocat LOCTYPE="URL" xlink:href="MAX/737437.jpg"/></mets:file>
      <mets:file ID="MAX_737438"><mets:FLocat LOCTYPE="URL" xlink:href="MAX/737438.jpg"/></mets:file>
    </mets:fileGrp>
  </mets:fileSec>
  <mets:structMap TYPE="LOGICAL">
    <mets:div ID="log737429" TYPE="monograph" DMDID="md737429" LABEL="Ode In Solemni Panegyri Avgvstissimo Ac Potentissimo">
      <mets:div ID="log1" TYPE="title_page"/>
      <mets:div ID="log2" TYPE="section" LABEL="[Ode]"/>
    </mets:div>
  </mets:structMap>
  <mets:structMap TYPE="PHYSICAL">
    <mets:div ID="physroot" TYPE="physSequence">
      <mets:div ID="phys737434" TYPE="page" ORDER="1" CONTENTIDS="urn:nbn:de:gbv:3:3-21437-p0001-0"><mets:fptr FILEID="MAX_737434"/></mets:div>
      <mets:div ID="phys737436" TYPE="page" ORDER="2" CONTENTIDS="urn:nbn:de:gbv:3:3-21437-p0002-2"><mets:fptr FILEID="MAX_737436"/></mets:div>
      <mets:div ID="phys737437" TYPE="page" ORDER="3" CONTENTIDS="urn:nbn:de:gbv:3:3-21437-p0003-4"><mets:fptr FILEID="MAX_737437"/></mets:div>
      <mets:div ID="phys737438" TYPE="page" ORDER="4" CONTENTIDS="urn:nbn:de:gbv:3:3-21437-p0004-6"><mets:fptr FILEID="MAX_737438"/></mets:div>
    </mets:div>
  </mets:structMap>
  <mets:structLink>
    <mets:smLink xlink:from="log737429" xlink:to="physroot"/>
    <mets:smLink xlink:from="log1" xlink:to="phys737434"/>
    <mets:smLink xlink:from="log2" xlink:to="phys737436"/>
  </mets:structLink>
</mets:mets>
"#;

const ALTO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<alto xmlns="http://www.loc.gov/standards/alto/ns-v2#">
  <Layout>
    <Page ID="Page1" WIDTH="1200" HEIGHT="1600">
      <PrintSpace>
        <TextBlock ID="b1">
          <TextLine ID="l1" HPOS="80" VPOS="120" WIDTH="1000" HEIGHT="48">
            <String CONTENT="Ode"/>
            <String CONTENT="In"/>
            <String CONTENT="Solemni"/>
          </TextLine>
        </TextBlock>
      </PrintSpace>
    </Page>
  </Layout>
</alto>
"#;

fn seed_images(dir: &Path, names: &[&str], width: u32, height: u32) {
    std::fs::create_dir_all(dir).unwrap();
    let processor = ImageProcessor::new(90, 0);
    for name in names {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([235, 235, 235]),
        ));
        processor.write_jpeg(&img, dir.join(name), None).unwrap();
    }
}

#[test]
fn mets_run_produces_pdf_and_enriched_mets() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let mets_path = root.join("737429.xml");
    std::fs::write(&mets_path, METS).unwrap();
    seed_images(
        &root.join("MAX"),
        &["737434.jpg", "737436.jpg", "737437.jpg", "737438.jpg"],
        1200,
        1600,
    );

    let mut derivans = Derivans::new(&mets_path, RunConfig::default()).unwrap();
    assert_eq!(derivans.identifier(), "191092622");
    let summary = derivans.run().unwrap();

    assert_eq!(summary.pages, 4);
    assert_eq!(summary.granulars, 4);

    // the PDF is named by the descriptive identifier and holds all pages
    let pdf_path = root.join("191092622.pdf");
    assert!(pdf_path.exists());
    let doc = lopdf::Document::load(&pdf_path).unwrap();
    assert_eq!(doc.get_pages().len(), 4);
    assert!(doc.catalog().unwrap().get(b"Outlines").is_ok());

    // the METS gained the DOWNLOAD group and the first-child pointer
    let store = MetadataStore::load(&mets_path).unwrap();
    let file_sec = store.root().first("fileSec").unwrap();
    let downloads: Vec<_> = file_sec
        .elements()
        .filter(|g| g.is("fileGrp") && g.attr("USE") == Some("DOWNLOAD"))
        .collect();
    assert_eq!(downloads.len(), 1);
    assert_eq!(
        downloads[0].first("file").unwrap().attr("ID"),
        Some("PDF_191092622")
    );
    let container = store.logical_root_div().unwrap();
    let first_child = container.elements().next().unwrap();
    assert_eq!(first_child.local_name(), "fptr");
    assert_eq!(first_child.attr("FILEID"), Some("PDF_191092622"));
}

#[test]
fn bare_image_directory_run_derives_identifier_from_name() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("only_images");
    seed_images(
        &root.join("MAX"),
        &[
            "0001.jpg", "0002.jpg", "0003.jpg", "0004.jpg", "0005.jpg", "0006.jpg",
        ],
        600,
        800,
    );

    let mut derivans = Derivans::new(&root, RunConfig::default()).unwrap();
    let summary = derivans.run().unwrap();

    assert_eq!(summary.pages, 6);
    assert_eq!(summary.granulars, 0);

    let pdf_path = root.join("only_images.pdf");
    assert!(pdf_path.exists());
    let doc = lopdf::Document::load(&pdf_path).unwrap();
    assert_eq!(doc.get_pages().len(), 6);
    // no metadata, no outline
    assert!(doc.catalog().unwrap().get(b"Outlines").is_err());
}

#[test]
fn scale_step_bounds_outputs_and_ocr_text_layer_is_present() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("148811035");
    seed_images(&root.join("MAX"), &["00000001.jpg"], 1200, 1600);
    std::fs::create_dir_all(root.join("FULLTEXT")).unwrap();
    std::fs::write(root.join("FULLTEXT/00000001.xml"), ALTO).unwrap();

    let mut config = RunConfig::default();
    config.maximal = 800;
    config.steps = vec![
        StepConfig {
            kind: StepKind::ImageScale,
            input_subdir: None,
            output_subdir: Some("IMAGE_80".into()),
            quality: Some(80),
            maximal: Some(800),
            insert_into_mets: None,
        },
        StepConfig {
            kind: StepKind::Pdf,
            input_subdir: None,
            output_subdir: None,
            quality: None,
            maximal: None,
            insert_into_mets: None,
        },
    ];

    let mut derivans = Derivans::new(&root, config).unwrap();
    let summary = derivans.run().unwrap();
    assert_eq!(summary.pages, 1);

    // scaled derivative respects the maximal bound
    let scaled = image::open(root.join("IMAGE_80/00000001.jpg")).unwrap();
    assert!(scaled.width().max(scaled.height()) <= 800);

    // the page carries a searchable text layer
    let doc = lopdf::Document::load(root.join("148811035.pdf")).unwrap();
    let page_id = *doc.get_pages().get(&1).unwrap();
    let content = doc.get_page_content(page_id).unwrap();
    let text = String::from_utf8_lossy(&content);
    assert!(text.contains("Tj"));
}

#[test]
fn missing_input_is_reported_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let result = Derivans::new(dir.path().join("nowhere"), RunConfig::default());
    assert!(result.is_err());
}

#[test]
fn directory_without_image_subdir_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let result = Derivans::new(dir.path(), RunConfig::default());
    assert!(result.is_err());
}
