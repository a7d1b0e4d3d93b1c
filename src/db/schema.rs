pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Folders: registered parent directories
CREATE TABLE IF NOT EXISTS folders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    path TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Imagesets: one row per imageset subfolder
CREATE TABLE IF NOT EXISTS imagesets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    folder_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    folder_path TEXT NOT NULL,
    imageset_folder_path TEXT NOT NULL,
    status TEXT,
    edits TEXT,
    needs TEXT,
    good_for TEXT,           -- copied from biz.good_for
    source TEXT,
    prompt TEXT,             -- copied from the source section
    cover_image_path TEXT,
    orig_image_path TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (folder_id) REFERENCES folders(id) ON DELETE CASCADE,
    UNIQUE(folder_id, name)
);

-- Sections: named JSON payloads attached to an imageset
CREATE TABLE IF NOT EXISTS imageset_sections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    imageset_id INTEGER NOT NULL,
    section_name TEXT NOT NULL,
    section_data TEXT,       -- JSON object
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (imageset_id) REFERENCES imagesets(id) ON DELETE CASCADE,
    UNIQUE(imageset_id, section_name)
);

-- Interviews: generated Q&A artifacts, one per template
CREATE TABLE IF NOT EXISTS interviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    imageset_id INTEGER NOT NULL,
    interview_template TEXT NOT NULL,
    image_file_path TEXT NOT NULL,
    interview_response TEXT,
    interview_raw TEXT,      -- JSON
    interview_parsed TEXT,   -- JSON
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (imageset_id) REFERENCES imagesets(id) ON DELETE CASCADE
);

-- Files: live listing of each imageset folder
CREATE TABLE IF NOT EXISTS imagesetfiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    imageset_id INTEGER NOT NULL,
    filename TEXT NOT NULL,
    fullpath TEXT NOT NULL,
    extension TEXT,
    file_type TEXT,
    file_size INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (imageset_id) REFERENCES imagesets(id) ON DELETE CASCADE,
    UNIQUE(imageset_id, filename)
);

-- File tags: filename suffix labels
CREATE TABLE IF NOT EXISTS imagesetfile_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    imagesetfile_id INTEGER NOT NULL,
    tag TEXT NOT NULL,
    FOREIGN KEY (imagesetfile_id) REFERENCES imagesetfiles(id) ON DELETE CASCADE,
    UNIQUE(imagesetfile_id, tag)
);

CREATE INDEX IF NOT EXISTS idx_folders_name ON folders(name);
CREATE INDEX IF NOT EXISTS idx_folders_path ON folders(path);

CREATE INDEX IF NOT EXISTS idx_imagesets_folder_id ON imagesets(folder_id);
CREATE INDEX IF NOT EXISTS idx_imagesets_name ON imagesets(name);
CREATE INDEX IF NOT EXISTS idx_imagesets_status ON imagesets(status);
CREATE INDEX IF NOT EXISTS idx_imagesets_source ON imagesets(source);
CREATE INDEX IF NOT EXISTS idx_imagesets_folder_name ON imagesets(folder_id, name);

CREATE INDEX IF NOT EXISTS idx_imageset_sections_imageset_id ON imageset_sections(imageset_id);
CREATE INDEX IF NOT EXISTS idx_imageset_sections_name ON imageset_sections(section_name);

CREATE INDEX IF NOT EXISTS idx_interviews_imageset_id ON interviews(imageset_id);
CREATE INDEX IF NOT EXISTS idx_interviews_template ON interviews(interview_template);
CREATE INDEX IF NOT EXISTS idx_interviews_created_at ON interviews(created_at);

CREATE INDEX IF NOT EXISTS idx_imagesetfiles_imageset_id ON imagesetfiles(imageset_id);
CREATE INDEX IF NOT EXISTS idx_imagesetfiles_filename ON imagesetfiles(filename);
CREATE INDEX IF NOT EXISTS idx_imagesetfiles_file_type ON imagesetfiles(file_type);

CREATE INDEX IF NOT EXISTS idx_imagesetfile_tags_file_id ON imagesetfile_tags(imagesetfile_id);
CREATE INDEX IF NOT EXISTS idx_imagesetfile_tags_tag ON imagesetfile_tags(tag);
"#;
