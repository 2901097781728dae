use paxrm::record::{AttrInfo, AttrType, Record, RecordFileManager};

fn employee_row(id: i32, name: &str) -> Vec<u8> {
    let mut row = id.to_be_bytes().to_vec();
    let mut padded = [b' '; 12];
    let len = name.len().min(padded.len());
    padded[..len].copy_from_slice(&name.as_bytes()[..len]);
    row.extend_from_slice(&padded);
    row
}

fn main() {
    println!("paxrm - PAX record manager demo");
    println!("===============================\n");

    let path = std::env::temp_dir().join("paxrm_demo.rel");
    let manager = RecordFileManager::new();
    manager
        .destroy_file(&path)
        .expect("Failed to clear old demo file");

    let attrs = vec![
        AttrInfo::new("emp", "id", AttrType::Integer, 4),
        AttrInfo::new("emp", "name", AttrType::Char, 12),
    ];
    let mut file = manager
        .create_file(&path, &attrs)
        .expect("Failed to create relation file");
    println!("Created relation file: {}", path.display());
    println!(
        "  - {} slots per page, header {} bytes, mini-pages of {} bytes\n",
        file.layout().slots_per_page(),
        file.layout().header_size(),
        file.layout().mini_page_size()
    );

    let names = ["ada", "brian", "grace", "ken", "barbara"];
    let mut rids = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let rid = file
            .insert_record(&employee_row(i as i32, name))
            .expect("Failed to insert record");
        println!("Inserted {} at {}", name, rid);
        rids.push(rid);
    }

    file.delete_record(rids[1]).expect("Failed to delete record");
    println!("\nDeleted {}", rids[1]);

    let renamed = Record::new(rids[3], employee_row(3, "dennis"));
    let outcome = file.update_record(&renamed).expect("Failed to update record");
    println!("Updated {}: {:?}", rids[3], outcome);

    println!("\nNames by scan:");
    {
        let mut scan = manager.create_scan();
        scan.open_scan(&file, &attrs[1..])
            .expect("Failed to open scan");
        for record in &mut scan {
            let record = record.expect("Scan failed");
            println!(
                "  - {}: {:?}",
                record.rid(),
                String::from_utf8_lossy(record.data()).trim_end()
            );
        }
        scan.close_scan();
    }

    println!(
        "\nPages in use: {}",
        file.num_pages().expect("Failed to count pages")
    );
    file.close().expect("Failed to close relation file");

    manager.destroy_file(&path).expect("Failed to remove demo file");
    println!("\nDemo completed successfully!");
}
