use afl::fuzz;
use jclass::item::file::ClassFile;

fn main() {
    fuzz!(|data: &[u8]| {
        if let Ok(mut class_file) = ClassFile::parse(data) {
            let _ = class_file.save();
        }
    });
}
