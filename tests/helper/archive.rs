//! Archive builders

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

/// Build a zip archive in memory from `(path, content)` pairs
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let mut writer = zip::ZipWriter::new(&mut buffer);
    for (name, content) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    buffer.into_inner()
}

/// An LSCherry release archive wrapped in a versioned folder
pub fn cherry_archive(version: &str) -> Vec<u8> {
    let blend = format!("LSCherry-{version}/LS Cherry.blend");
    let readme = format!("LSCherry-{version}/README.txt");
    zip_bytes(&[(&blend, "blend"), (&readme, version)])
}
