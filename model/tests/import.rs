//! End-to-end import of a miniature extracted PMZ folder: two transports, a
//! cross-transport transfer, a scheme with an additional node, a static image
//! index and a `.vec` asset.

use std::io::Write;
use std::path::PathBuf;

use model::{
    convert_resources, extract_pmz, import_map, store_model, CityInfo, GeonameProvider,
};

struct FakeGeonames;

impl GeonameProvider for FakeGeonames {
    fn resolve_city(&self, city_name: &str, _country_name: &str) -> Option<CityInfo> {
        if city_name == "Testville" {
            Some(CityInfo {
                geoname_id: 42,
                latitude: 1.5,
                longitude: 2.5,
            })
        } else {
            None
        }
    }
}

fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "pmz-model-test-{}-{}",
        std::process::id(),
        name
    ));
    if dir.exists() {
        fs_err::remove_dir_all(&dir).unwrap();
    }
    fs_err::create_dir_all(&dir).unwrap();
    dir
}

fn write_fixture_map(dir: &PathBuf) {
    // Real archives are windows-1251; "Метро" is its byte sequence below.
    let mut metro_trp: Vec<u8> = Vec::new();
    metro_trp.extend_from_slice(b"[Options]\nType=");
    metro_trp.extend_from_slice(&[0xCC, 0xE5, 0xF2, 0xF0, 0xEE]);
    metro_trp.extend_from_slice(
        concat!(
            "\n",
            "\n",
            "[LineRed]\n",
            "Name=Red\n",
            "Alias=Red line\n",
            "Stations=Alpha,Beta,Gamma\n",
            "Driving=1.30,2\n",
            "Delays=2.30\n",
            "\n",
            "[Transfers]\n",
            "t1=Red,Beta,Blue,Delta,0.45\n",
        )
        .as_bytes(),
    );
    fs_err::write(dir.join("Metro.trp"), metro_trp).unwrap();

    fs_err::write(
        dir.join("Bus.trp"),
        concat!(
            "[LineBlue]\n",
            "Name=Blue\n",
            "Stations=Delta,Epsilon\n",
            "Driving=1\n",
        ),
    )
    .unwrap();

    fs_err::write(
        dir.join("Metro.map"),
        concat!(
            "[Options]\n",
            "LinesWidth=5\n",
            "\n",
            "[AdditionalNodes]\n",
            "n1=Red,Alpha,Beta,100,150\n",
            "\n",
            "[Red]\n",
            "Color=ff0000\n",
            "Coordinates=100,100,200,100,300,200\n",
            "\n",
            "[Blue]\n",
            "Coordinates=400,100,450,150\n",
        ),
    )
    .unwrap();

    fs_err::write(
        dir.join("Metro.cty"),
        concat!(
            "[Options]\n",
            "CityName=Testville\n",
            "Country=Testland\n",
            "DelayNames=Day,Night\n",
            "Comment=Test map\n",
            "MapAuthors=Somebody\n",
        ),
    )
    .unwrap();

    fs_err::write(
        dir.join("Info.txt"),
        concat!(
            "[Options]\n",
            "Type=Image\n",
            "Caption=Photos\n",
            "\n",
            "[Red]\n",
            "Alpha=alpha.vec\n",
        ),
    )
    .unwrap();

    fs_err::write(
        dir.join("alpha.vec"),
        concat!(
            "Size 100x100\n",
            "PenColor 000000\n",
            "Line 10,10,90,90,2\n",
        ),
    )
    .unwrap();
}

#[test]
fn imports_a_complete_map() {
    let src = fixture_dir("src");
    write_fixture_map(&src);

    let container = import_map(&src, "Testville.zip", 20260807, &FakeGeonames).unwrap();

    // Metadata went through the geocoder and the delay classifier.
    assert_eq!(container.meta.geoname_id, Some(42));
    assert_eq!(container.meta.latitude, 1.5);
    assert_eq!(container.meta.delays.len(), 2);
    assert_eq!(container.meta.delays[0].kind, "day");
    assert_eq!(container.meta.delays[1].kind, "night");
    assert!(container.meta.schemes[0].root);

    // Metro.trp is first; Bus.trp had no type anywhere, so it defaulted.
    assert_eq!(container.transports.len(), 2);
    assert_eq!(container.transports[0].name, "metro");
    assert_eq!(container.transports[0].type_name, "Метро");
    assert_eq!(container.transports[1].name, "bus");
    assert_eq!(container.transports[1].type_name, "Metro");

    let red = &container.transports[0].lines[0];
    let station_names: Vec<&str> = red.stations.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(station_names, vec!["Alpha", "Beta", "Gamma"]);
    // Both directions of both hops.
    assert_eq!(red.segments.len(), 4);
    assert!(red
        .segments
        .iter()
        .any(|s| s.from == red.stations[0].id && s.to == red.stations[1].id
            && s.delay == Some(90.0)));
    // One declared delay slot against two map slots: zero-padded.
    assert_eq!(red.delays.len(), 2);
    assert_eq!(red.delays.get("0"), Some(&150.0));
    assert_eq!(red.delays.get("1"), Some(&0.0));

    // The transfer's forward reference to Bus.trp's line resolved to the
    // same id the registration later produced.
    let blue = &container.transports[1].lines[0];
    let transfer = &container.transports[0].transfers[0];
    assert_eq!(transfer.from, red.stations[1].id);
    assert_eq!(transfer.to, blue.stations[0].id);
    assert_eq!(transfer.delay, Some(45.0));
    assert!(transfer.is_visible);

    // The scheme bound coordinates to the topology.
    assert_eq!(container.schemes.len(), 1);
    let scheme = &container.schemes[0];
    assert_eq!(scheme.name, "metro");
    assert_eq!(scheme.display_name, "Метро");
    assert_eq!(scheme.type_name, "ROOT");
    assert_eq!(scheme.lines_width, 5);
    assert_eq!(scheme.lines.len(), 2);

    let red_drawn = &scheme.lines[0];
    assert_eq!(red_drawn.name, "Red");
    assert_eq!(red_drawn.line_color, "ff0000");
    assert_eq!(red_drawn.line_width, 5);
    assert_eq!(red_drawn.segments.len(), 2);
    // The additional node shaped the Alpha-Beta segment.
    let shaped = &red_drawn.segments[0];
    assert_eq!(shaped.points.len(), 3);
    assert_eq!(shaped.points[1], (100.0, 150.0));
    assert!(shaped.is_working);
    assert!(red_drawn.stations.iter().all(|s| s.is_working));

    // One visible transfer with both endpoints on this scheme.
    assert_eq!(scheme.transfers.len(), 1);
    assert_eq!(scheme.transfers[0].from_coord, Some((200, 100)));
    assert_eq!(scheme.transfers[0].to_coord, Some((400, 100)));

    // Bounding box: max coordinate plus the fixed gap.
    assert_eq!(scheme.width, 600);
    assert_eq!(scheme.height, 350);

    // Static image index.
    assert_eq!(container.images.len(), 1);
    assert_eq!(container.images[0].station, "Alpha");

    assert_eq!(container.texts.len(), 1);
    assert_eq!(container.texts[0].locale, "en");
}

#[test]
fn converts_assets_and_stores_the_file_set() {
    let src = fixture_dir("convert-src");
    write_fixture_map(&src);
    let dst = fixture_dir("convert-dst");

    let mut container = import_map(&src, "Testville.zip", 20260807, &FakeGeonames).unwrap();
    convert_resources(&mut container, &src, &dst).unwrap();
    store_model(&container, &dst).unwrap();

    assert_eq!(container.images[0].image, "res/stations/alpha.svg");
    let svg = fs_err::read_to_string(dst.join("res/stations/alpha.svg")).unwrap();
    assert!(svg.contains("<polyline"));
    let meta = fs_err::read_to_string(dst.join("res/stations/alpha.svg.meta")).unwrap();
    assert!(meta.contains("\"width\""));

    for file in [
        "meta.json",
        "transports/metro.json",
        "transports/bus.json",
        "schemes/metro.json",
        "images.json",
        "texts/en.json",
    ] {
        assert!(dst.join(file).is_file(), "missing {}", file);
    }
}

#[test]
fn missing_metro_trp_aborts() {
    let src = fixture_dir("broken");
    write_fixture_map(&src);
    fs_err::remove_file(src.join("Metro.trp")).unwrap();

    let err = import_map(&src, "Testville.zip", 0, &FakeGeonames).unwrap_err();
    assert!(err.to_string().contains("Metro.trp"));
}

#[test]
fn dangling_transfer_reference_aborts() {
    let src = fixture_dir("dangling");
    write_fixture_map(&src);
    // Reference a line nobody defines.
    fs_err::write(
        src.join("Metro.trp"),
        concat!(
            "[LineRed]\n",
            "Name=Red\n",
            "Stations=Alpha,Beta\n",
            "Driving=1\n",
            "\n",
            "[Transfers]\n",
            "t1=Red,Alpha,Ghost,Nowhere\n",
        ),
    )
    .unwrap();

    let err = import_map(&src, "Testville.zip", 0, &FakeGeonames).unwrap_err();
    assert!(err.to_string().contains("Nowhere at Ghost"));
}

#[test]
fn extracts_pmz_archives() {
    let dir = fixture_dir("zip");
    let archive_path = dir.join("Testville.pmz");
    {
        let file = fs_err::File::create(&archive_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        writer.start_file("Metro.cty", options).unwrap();
        writer.write_all(b"[Options]\nCityName=Testville\n").unwrap();
        writer.finish().unwrap();
    }

    let extracted = dir.join("extracted");
    extract_pmz(&archive_path, &extracted).unwrap();
    let cty = fs_err::read_to_string(extracted.join("Metro.cty")).unwrap();
    assert!(cty.contains("Testville"));
}
