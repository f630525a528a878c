pub const MAX_TEXT_CHARS: usize = 100_000;
pub const MAX_TITLE_CHARS: usize = 1_000;
pub const MAX_KEYWORDS_CHARS: usize = 1_000;
pub const MAX_IDENTIFIER_CHARS: usize = 256;

pub const FORMATS: &[&str] = &["markdown", "text", "html"];
pub const POSITIONS: &[&str] = &["begin", "end"];
pub const NEWLINES: &[&str] = &["prepend", "append", "enclose"];
pub const SHEET_TITLE_TYPES: &[&str] = &[
    "heading1", "heading2", "heading3", "heading4", "heading5", "heading6", "comment", "filename",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text { max_chars: usize },
    Identifier,
    Enum(&'static [&'static str]),
    /// JSON bool rendered as `YES`/`NO`.
    Flag,
    /// Non-negative integer rendered in decimal.
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDef {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDef {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamDef],
    pub destructive: bool,
    pub needs_response: bool,
    pub needs_access_token: bool,
}

pub mod action_names {
    pub const NEW_SHEET: &str = "new-sheet";
    pub const NEW_GROUP: &str = "new-group";
    pub const INSERT: &str = "insert";
    pub const ATTACH_NOTE: &str = "attach-note";
    pub const ATTACH_KEYWORDS: &str = "attach-keywords";
    pub const UPDATE_NOTE: &str = "update-note";
    pub const REMOVE_NOTE: &str = "remove-note";
    pub const REMOVE_KEYWORDS: &str = "remove-keywords";
    pub const SET_GROUP_TITLE: &str = "set-group-title";
    pub const SET_SHEET_TITLE: &str = "set-sheet-title";
    pub const MOVE: &str = "move";
    pub const COPY: &str = "copy";
    pub const TRASH: &str = "trash";
    pub const GET_ITEM: &str = "get-item";
    pub const GET_ROOT_ITEMS: &str = "get-root-items";
    pub const READ_SHEET: &str = "read-sheet";
    pub const GET_QUICK_LOOK_URL: &str = "get-quick-look-url";
    pub const OPEN: &str = "open";
    pub const OPEN_ALL: &str = "open-all";
    pub const OPEN_RECENT: &str = "open-recent";
    pub const OPEN_FAVORITES: &str = "open-favorites";
    pub const GET_VERSION: &str = "get-version";
    pub const AUTHORIZE: &str = "authorize";
}

const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> ParamDef {
    ParamDef {
        name,
        kind,
        required: true,
        description,
    }
}

const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> ParamDef {
    ParamDef {
        name,
        kind,
        required: false,
        description,
    }
}

const TEXT: ParamKind = ParamKind::Text {
    max_chars: MAX_TEXT_CHARS,
};
const TITLE: ParamKind = ParamKind::Text {
    max_chars: MAX_TITLE_CHARS,
};
const KEYWORDS: ParamKind = ParamKind::Text {
    max_chars: MAX_KEYWORDS_CHARS,
};

const ITEM_ID: ParamDef = required("id", ParamKind::Identifier, "Sheet or group identifier");
const FORMAT: ParamDef = optional("format", ParamKind::Enum(FORMATS), "Input text format");
const TARGET_GROUP: ParamDef = optional(
    "targetGroup",
    ParamKind::Identifier,
    "Destination group identifier",
);
const POSITION_INDEX: ParamDef = optional("index", ParamKind::Index, "Position within the group");
const RECURSIVE: ParamDef = optional("recursive", ParamKind::Flag, "Include child groups");

pub const ACTIONS: &[ActionDef] = &[
    ActionDef {
        name: action_names::NEW_SHEET,
        description: "Create a new sheet",
        params: &[
            required("text", TEXT, "Sheet contents"),
            optional("group", ParamKind::Identifier, "Target group"),
            FORMAT,
            POSITION_INDEX,
        ],
        destructive: false,
        needs_response: false,
        needs_access_token: false,
    },
    ActionDef {
        name: action_names::NEW_GROUP,
        description: "Create a new group",
        params: &[
            required("name", TITLE, "Group name"),
            optional("parent", ParamKind::Identifier, "Parent group"),
            POSITION_INDEX,
        ],
        destructive: false,
        needs_response: true,
        needs_access_token: false,
    },
    ActionDef {
        name: action_names::INSERT,
        description: "Insert text into an existing sheet",
        params: &[
            ITEM_ID,
            required("text", TEXT, "Text to insert"),
            FORMAT,
            optional("position", ParamKind::Enum(POSITIONS), "Insert position"),
            optional("newline", ParamKind::Enum(NEWLINES), "Newline handling"),
        ],
        destructive: false,
        needs_response: false,
        needs_access_token: false,
    },
    ActionDef {
        name: action_names::ATTACH_NOTE,
        description: "Attach a note to a sheet",
        params: &[ITEM_ID, required("text", TEXT, "Note contents"), FORMAT],
        destructive: false,
        needs_response: false,
        needs_access_token: false,
    },
    ActionDef {
        name: action_names::ATTACH_KEYWORDS,
        description: "Attach comma-separated keywords to a sheet",
        params: &[ITEM_ID, required("keywords", KEYWORDS, "Comma-separated keywords")],
        destructive: false,
        needs_response: false,
        needs_access_token: false,
    },
    ActionDef {
        name: action_names::UPDATE_NOTE,
        description: "Replace the contents of a sheet note",
        params: &[
            ITEM_ID,
            required("index", ParamKind::Index, "Note index"),
            required("text", TEXT, "New note contents"),
            FORMAT,
        ],
        destructive: true,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::REMOVE_NOTE,
        description: "Remove a note from a sheet",
        params: &[ITEM_ID, required("index", ParamKind::Index, "Note index")],
        destructive: true,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::REMOVE_KEYWORDS,
        description: "Remove keywords from a sheet",
        params: &[ITEM_ID, required("keywords", KEYWORDS, "Comma-separated keywords")],
        destructive: true,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::SET_GROUP_TITLE,
        description: "Rename a group",
        params: &[
            required("group", ParamKind::Identifier, "Group identifier"),
            required("title", TITLE, "New title"),
        ],
        destructive: false,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::SET_SHEET_TITLE,
        description: "Set a sheet heading, comment, or filename",
        params: &[
            required("sheet", ParamKind::Identifier, "Sheet identifier"),
            required("title", TITLE, "New title"),
            required("type", ParamKind::Enum(SHEET_TITLE_TYPES), "Title kind"),
        ],
        destructive: false,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::MOVE,
        description: "Move a sheet or group",
        params: &[ITEM_ID, TARGET_GROUP, POSITION_INDEX],
        destructive: true,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::COPY,
        description: "Copy a sheet or group",
        params: &[ITEM_ID, TARGET_GROUP, POSITION_INDEX],
        destructive: false,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::TRASH,
        description: "Move a sheet or group to the trash",
        params: &[ITEM_ID],
        destructive: true,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::GET_ITEM,
        description: "Read metadata for a sheet or group",
        params: &[ITEM_ID, RECURSIVE],
        destructive: false,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::GET_ROOT_ITEMS,
        description: "List library root items",
        params: &[RECURSIVE],
        destructive: false,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::READ_SHEET,
        description: "Read sheet contents",
        params: &[ITEM_ID, optional("text", ParamKind::Flag, "Include sheet text")],
        destructive: false,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::GET_QUICK_LOOK_URL,
        description: "Get a Quick Look URL for a sheet",
        params: &[ITEM_ID],
        destructive: false,
        needs_response: true,
        needs_access_token: true,
    },
    ActionDef {
        name: action_names::OPEN,
        description: "Open a sheet or group in the application",
        params: &[ITEM_ID],
        destructive: false,
        needs_response: false,
        needs_access_token: false,
    },
    ActionDef {
        name: action_names::OPEN_ALL,
        description: "Show the All section",
        params: &[],
        destructive: false,
        needs_response: false,
        needs_access_token: false,
    },
    ActionDef {
        name: action_names::OPEN_RECENT,
        description: "Show the Last Added section",
        params: &[],
        destructive: false,
        needs_response: false,
        needs_access_token: false,
    },
    ActionDef {
        name: action_names::OPEN_FAVORITES,
        description: "Show the Favorites section",
        params: &[],
        destructive: false,
        needs_response: false,
        needs_access_token: false,
    },
    ActionDef {
        name: action_names::GET_VERSION,
        description: "Read application and API version",
        params: &[],
        destructive: false,
        needs_response: true,
        needs_access_token: false,
    },
    ActionDef {
        name: action_names::AUTHORIZE,
        description: "Request an access token from the application",
        params: &[required("appname", TITLE, "Name shown in the authorization prompt")],
        destructive: false,
        needs_response: true,
        needs_access_token: false,
    },
];

pub fn find_action_def(name: &str) -> Option<&'static ActionDef> {
    ACTIONS.iter().find(|def| def.name == name)
}

impl ActionDef {
    pub fn param(&self, name: &str) -> Option<&'static ParamDef> {
        self.params.iter().find(|param| param.name == name)
    }
}
