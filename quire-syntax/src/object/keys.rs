//! Well-known dictionary keys and name values.

macro_rules! key {
    ($i:ident, $e:expr) => {
        #[allow(missing_docs)]
        pub const $i: &[u8] = $e;
    };
}

key!(A, b"A");
key!(AP, b"AP");
key!(AS, b"AS");
key!(AESV2, b"AESV2");
key!(AESV3, b"AESV3");
key!(ALL_OFF, b"AllOff");
key!(ALL_ON, b"AllOn");
key!(ALPHA, b"Alpha");
key!(ALTERNATE, b"Alternate");
key!(ANNOTS, b"Annots");
key!(ANY_OFF, b"AnyOff");
key!(ANTI_ALIAS, b"AntiAlias");
key!(AUTHOR, b"Author");
key!(B, b"B");
key!(BACKGROUND, b"Background");
key!(BASE_ENCODING, b"BaseEncoding");
key!(BASE_FONT, b"BaseFont");
key!(BASE_STATE, b"BaseState");
key!(BBOX, b"BBox");
key!(BC, b"BC");
key!(BITS_PER_COMPONENT, b"BitsPerComponent");
key!(BITS_PER_COORDINATE, b"BitsPerCoordinate");
key!(BITS_PER_FLAG, b"BitsPerFlag");
key!(BITS_PER_SAMPLE, b"BitsPerSample");
key!(BM, b"BM");
key!(BOUNDS, b"Bounds");
key!(BPC, b"BPC");
key!(C0, b"C0");
key!(C1, b"C1");
key!(CA, b"CA");
key!(CA_NS, b"ca");
key!(CATALOG, b"Catalog");
key!(CF, b"CF");
key!(CFM, b"CFM");
key!(CHAR_PROCS, b"CharProcs");
key!(COLOR_SPACE, b"ColorSpace");
key!(COLORS, b"Colors");
key!(COLUMNS, b"Columns");
key!(CONTENTS, b"Contents");
key!(COORDS, b"Coords");
key!(COUNT, b"Count");
key!(CREATION_DATE, b"CreationDate");
key!(CREATOR, b"Creator");
key!(CROP_BOX, b"CropBox");
key!(CS, b"CS");
key!(D, b"D");
key!(DP, b"DP");
key!(DW, b"DW");
key!(DW2, b"DW2");
key!(DECODE, b"Decode");
key!(DECODE_PARMS, b"DecodeParms");
key!(DESCENDANT_FONTS, b"DescendantFonts");
key!(DIFFERENCES, b"Differences");
key!(DOMAIN, b"Domain");
key!(EARLY_CHANGE, b"EarlyChange");
key!(ENCODE, b"Encode");
key!(ENCODING, b"Encoding");
key!(ENCRYPT, b"Encrypt");
key!(ENCRYPT_METADATA, b"EncryptMetadata");
key!(EXTEND, b"Extend");
key!(EXT_G_STATE, b"ExtGState");
key!(F, b"F");
key!(FIRST, b"First");
key!(FIRST_CHAR, b"FirstChar");
key!(FILTER, b"Filter");
key!(FL, b"FL");
key!(FLAGS, b"Flags");
key!(FONT, b"Font");
key!(FONT_DESCRIPTOR, b"FontDescriptor");
key!(FONT_FILE, b"FontFile");
key!(FONT_FILE2, b"FontFile2");
key!(FONT_FILE3, b"FontFile3");
key!(FONT_MATRIX, b"FontMatrix");
key!(FORM, b"Form");
key!(FUNCTION, b"Function");
key!(FUNCTIONS, b"Functions");
key!(G, b"G");
key!(GAMMA, b"Gamma");
key!(GROUP, b"Group");
key!(H, b"H");
key!(HEIGHT, b"Height");
key!(I, b"I");
key!(ID, b"ID");
key!(IM, b"IM");
key!(IMAGE, b"Image");
key!(IMAGE_MASK, b"ImageMask");
key!(INDEX, b"Index");
key!(INFO, b"Info");
key!(INTERPOLATE, b"Interpolate");
key!(K, b"K");
key!(KEYWORDS, b"Keywords");
key!(KIDS, b"Kids");
key!(LC, b"LC");
key!(LENGTH, b"Length");
key!(LIMITS, b"Limits");
key!(LJ, b"LJ");
key!(LW, b"LW");
key!(LUMINOSITY, b"Luminosity");
key!(MASK, b"Mask");
key!(MATRIX, b"Matrix");
key!(MEDIA_BOX, b"MediaBox");
key!(MISSING_WIDTH, b"MissingWidth");
key!(ML, b"ML");
key!(MOD_DATE, b"ModDate");
key!(N, b"N");
key!(NAME, b"Name");
key!(NAMES, b"Names");
key!(NONE, b"None");
key!(NUMS, b"Nums");
key!(O, b"O");
key!(OC, b"OC");
key!(OCGS, b"OCGs");
key!(OCMD, b"OCMD");
key!(OCPROPERTIES, b"OCProperties");
key!(OE, b"OE");
key!(OFF, b"OFF");
key!(ON, b"ON");
key!(P, b"P");
key!(PAGE, b"Page");
key!(PAGES, b"Pages");
key!(PAINT_TYPE, b"PaintType");
key!(PATTERN, b"Pattern");
key!(PATTERN_TYPE, b"PatternType");
key!(PERMS, b"Perms");
key!(PREDICTOR, b"Predictor");
key!(PREV, b"Prev");
key!(PRINT, b"Print");
key!(PRINT_STATE, b"PrintState");
key!(PRODUCER, b"Producer");
key!(PROPERTIES, b"Properties");
key!(R, b"R");
key!(RANGE, b"Range");
key!(RECT, b"Rect");
key!(RESOURCES, b"Resources");
key!(RI, b"RI");
key!(ROOT, b"Root");
key!(ROTATE, b"Rotate");
key!(S, b"S");
key!(SA, b"SA");
key!(SHADING, b"Shading");
key!(SHADING_TYPE, b"ShadingType");
key!(SIZE, b"Size");
key!(SMASK, b"SMask");
key!(STM_F, b"StmF");
key!(STR_F, b"StrF");
key!(SUBJECT, b"Subject");
key!(SUBTYPE, b"Subtype");
key!(TITLE, b"Title");
key!(TO_UNICODE, b"ToUnicode");
key!(TR, b"TR");
key!(TRANSPARENCY, b"Transparency");
key!(TYPE, b"Type");
key!(U, b"U");
key!(UE, b"UE");
key!(USAGE, b"Usage");
key!(USE_CMAP, b"UseCMap");
key!(V, b"V");
key!(VE, b"VE");
key!(VIEW, b"View");
key!(VIEW_STATE, b"ViewState");
key!(W, b"W");
key!(W2, b"W2");
key!(WHITE_POINT, b"WhitePoint");
key!(WIDTH, b"Width");
key!(WIDTHS, b"Widths");
key!(X_OBJECT, b"XObject");
key!(XREF, b"XRef");
key!(XREF_STM, b"XRefStm");
key!(X_STEP, b"XStep");
key!(Y_STEP, b"YStep");
key!(OBJ_STM, b"ObjStm");
key!(IDENTITY, b"Identity");

// Filter names and their abbreviations.
key!(ASCII_HEX_DECODE, b"ASCIIHexDecode");
key!(ASCII_HEX_DECODE_ABBREVIATION, b"AHx");
key!(ASCII85_DECODE, b"ASCII85Decode");
key!(ASCII85_DECODE_ABBREVIATION, b"A85");
key!(LZW_DECODE, b"LZWDecode");
key!(LZW_DECODE_ABBREVIATION, b"LZW");
key!(FLATE_DECODE, b"FlateDecode");
key!(FLATE_DECODE_ABBREVIATION, b"Fl");
key!(RUN_LENGTH_DECODE, b"RunLengthDecode");
key!(RUN_LENGTH_DECODE_ABBREVIATION, b"RL");
key!(CCITTFAX_DECODE, b"CCITTFaxDecode");
key!(CCITTFAX_DECODE_ABBREVIATION, b"CCF");
key!(DCT_DECODE, b"DCTDecode");
key!(DCT_DECODE_ABBREVIATION, b"DCT");
key!(JBIG2_DECODE, b"JBIG2Decode");
key!(JPX_DECODE, b"JPXDecode");
key!(CRYPT, b"Crypt");
key!(METADATA, b"Metadata");
key!(VERSION, b"Version");
key!(USER_UNIT, b"UserUnit");
key!(FUNCTION_TYPE, b"FunctionType");

// Color space families and their inline image abbreviations.
key!(DEVICE_GRAY, b"DeviceGray");
key!(DEVICE_RGB, b"DeviceRGB");
key!(DEVICE_CMYK, b"DeviceCMYK");
key!(CAL_GRAY, b"CalGray");
key!(CAL_RGB, b"CalRGB");
key!(CAL_CMYK, b"CalCMYK");
key!(LAB, b"Lab");
key!(ICC_BASED, b"ICCBased");
key!(INDEXED, b"Indexed");
key!(SEPARATION, b"Separation");
key!(DEVICE_N, b"DeviceN");
key!(RGB, b"RGB");
key!(CMYK, b"CMYK");

// Interpreter resources.
key!(TYPE0, b"Type0");
key!(TYPE3, b"Type3");
key!(VERTICES_PER_ROW, b"VerticesPerRow");
key!(PS, b"PS");
key!(TYPE1, b"Type1");
key!(MM_TYPE1, b"MMType1");
key!(TRUE_TYPE, b"TrueType");
key!(WIN_ANSI_ENCODING, b"WinAnsiEncoding");
key!(MAC_ROMAN_ENCODING, b"MacRomanEncoding");
key!(AND, b"And");
key!(OR, b"Or");
key!(NOT, b"Not");
